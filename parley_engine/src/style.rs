//! Styling helpers for terminal output.
//!
//! The [`DialogueStyle`] trait applies ANSI styling via the `colored` crate.
//! Implementations for `&str` and `String` are provided so string literals can
//! be styled directly.

use colored::{ColoredString, Colorize};
use textwrap::{Options, termwidth};

/// Convenience trait for applying color and style to text output.
pub trait DialogueStyle {
    fn speaker_style(&self) -> ColoredString;
    fn portrait_style(&self) -> ColoredString;
    fn line_style(&self) -> ColoredString;
    fn choice_style(&self) -> ColoredString;
    fn locked_style(&self) -> ColoredString;
    fn ended_style(&self) -> ColoredString;
    fn prompt_style(&self) -> ColoredString;
    fn flag_style(&self) -> ColoredString;
    fn notice_style(&self) -> ColoredString;
    fn error_style(&self) -> ColoredString;
    fn subheading_style(&self) -> ColoredString;
}

impl DialogueStyle for &str {
    fn speaker_style(&self) -> ColoredString {
        self.bold().truecolor(13, 130, 60)
    }
    fn portrait_style(&self) -> ColoredString {
        let bracketed = format!("[{self}]");
        bracketed.truecolor(75, 80, 75)
    }
    fn line_style(&self) -> ColoredString {
        self.italic().truecolor(102, 208, 250)
    }
    fn choice_style(&self) -> ColoredString {
        self.truecolor(220, 180, 40)
    }
    fn locked_style(&self) -> ColoredString {
        self.dimmed().strikethrough()
    }
    fn ended_style(&self) -> ColoredString {
        self.italic().truecolor(150, 150, 150)
    }
    fn prompt_style(&self) -> ColoredString {
        self.truecolor(223, 77, 10)
    }
    fn flag_style(&self) -> ColoredString {
        self.truecolor(220, 40, 220)
    }
    fn notice_style(&self) -> ColoredString {
        self.italic().truecolor(230, 230, 30)
    }
    fn error_style(&self) -> ColoredString {
        self.truecolor(230, 30, 30)
    }
    fn subheading_style(&self) -> ColoredString {
        self.underline()
    }
}

impl DialogueStyle for String {
    fn speaker_style(&self) -> ColoredString {
        self.as_str().speaker_style()
    }
    fn portrait_style(&self) -> ColoredString {
        self.as_str().portrait_style()
    }
    fn line_style(&self) -> ColoredString {
        self.as_str().line_style()
    }
    fn choice_style(&self) -> ColoredString {
        self.as_str().choice_style()
    }
    fn locked_style(&self) -> ColoredString {
        self.as_str().locked_style()
    }
    fn ended_style(&self) -> ColoredString {
        self.as_str().ended_style()
    }
    fn prompt_style(&self) -> ColoredString {
        self.as_str().prompt_style()
    }
    fn flag_style(&self) -> ColoredString {
        self.as_str().flag_style()
    }
    fn notice_style(&self) -> ColoredString {
        self.as_str().notice_style()
    }
    fn error_style(&self) -> ColoredString {
        self.as_str().error_style()
    }
    fn subheading_style(&self) -> ColoredString {
        self.as_str().subheading_style()
    }
}

/// Wrapping options for ordinary paragraphs.
pub fn normal_block() -> Options<'static> {
    Options::new(termwidth().saturating_sub(4).max(20))
}

/// Wrapping options for indented text such as choice lists.
pub fn indented_block() -> Options<'static> {
    normal_block().initial_indent("    ").subsequent_indent("    ")
}
