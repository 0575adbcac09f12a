use console::{style, Color, StyledObject};

/// How a status string is colored in terminal output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Good,
    Pending,
    Bad,
    Neutral,
}

impl Tone {
    /// Tone of a GitLab pipeline or merge request status.
    pub fn of_status(status: &str) -> Self {
        match status {
            "success" | "merged" | "passed" => Tone::Good,
            "failed" | "canceled" | "closed" => Tone::Bad,
            "running" | "pending" | "created" | "preparing" | "waiting_for_resource"
            | "scheduled" | "opened" => Tone::Pending,
            _ => Tone::Neutral,
        }
    }

    pub fn color(self) -> Option<Color> {
        match self {
            Tone::Good => Some(Color::Green),
            Tone::Pending => Some(Color::Yellow),
            Tone::Bad => Some(Color::Red),
            Tone::Neutral => None,
        }
    }
}

pub fn toned(text: impl std::fmt::Display, tone: Tone) -> StyledObject<String> {
    match tone.color() {
        Some(color) => style(text.to_string()).fg(color).bright(),
        None => style(text.to_string()).dim(),
    }
}

pub fn bright_red(text: impl std::fmt::Display) -> StyledObject<String> {
    toned(text, Tone::Bad)
}

pub fn cyan(text: impl std::fmt::Display) -> StyledObject<String> {
    style(text.to_string()).cyan()
}

pub fn dim(text: impl std::fmt::Display) -> StyledObject<String> {
    style(text.to_string()).dim()
}

pub fn bright(text: impl std::fmt::Display) -> StyledObject<String> {
    style(text.to_string()).bright()
}

pub fn magenta_bold(text: impl std::fmt::Display) -> StyledObject<String> {
    style(text.to_string()).magenta().bold()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_tones() {
        assert_eq!(Tone::of_status("success"), Tone::Good);
        assert_eq!(Tone::of_status("failed"), Tone::Bad);
        assert_eq!(Tone::of_status("running"), Tone::Pending);
        assert_eq!(Tone::of_status("manual"), Tone::Neutral);
        assert_eq!(Tone::Neutral.color(), None);
    }
}
