use anstyle::{AnsiColor, Style};
use is_terminal::IsTerminal;
use std::fmt::Display;
use std::io::{self, Write};

const STATUS_WIDTH: usize = 12;

#[derive(Debug, Clone, Copy)]
enum StatusKind {
    Pending,
    Success,
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

fn supports_color(stream: Stream) -> bool {
    let tty = match stream {
        Stream::Stdout => io::stdout().is_terminal(),
        Stream::Stderr => io::stderr().is_terminal(),
    };
    tty && std::env::var_os("NO_COLOR").is_none()
}

fn style_for(kind: StatusKind) -> Style {
    let style = Style::new().bold();
    match kind {
        StatusKind::Pending => style.fg_color(Some(AnsiColor::Cyan.into())),
        StatusKind::Success => style.fg_color(Some(AnsiColor::Green.into())),
        StatusKind::Info => style.fg_color(Some(AnsiColor::Blue.into())),
        StatusKind::Warn => style.fg_color(Some(AnsiColor::Yellow.into())),
        StatusKind::Error => style.fg_color(Some(AnsiColor::Red.into())),
    }
}

fn write_status(kind: StatusKind, stream: Stream, label: &str, message: &str) {
    let use_color = supports_color(stream);
    let mut handle: Box<dyn Write> = match stream {
        Stream::Stdout => Box::new(io::stdout().lock()),
        Stream::Stderr => Box::new(io::stderr().lock()),
    };

    let padded_label = if label.is_empty() {
        " ".repeat(STATUS_WIDTH)
    } else {
        format!("{:>width$}", label, width = STATUS_WIDTH)
    };

    let (prefix, suffix) = if use_color {
        let style = style_for(kind);
        (style.render().to_string(), style.render_reset().to_string())
    } else {
        (String::new(), String::new())
    };

    for (idx, line) in message.split('\n').enumerate() {
        if idx == 0 {
            let _ = writeln!(handle, "{prefix}{padded_label}{suffix} {line}");
        } else {
            let _ = writeln!(handle, "{:>width$} {line}", "", width = STATUS_WIDTH);
        }
    }
    let _ = handle.flush();
}

fn default_stream(kind: StatusKind) -> Stream {
    match kind {
        StatusKind::Warn | StatusKind::Error => Stream::Stderr,
        _ => Stream::Stdout,
    }
}

pub fn status(label: &str, message: impl Display) {
    let kind = StatusKind::Pending;
    write_status(kind, default_stream(kind), label, &message.to_string());
}

/// Status line on stderr, for commands whose stdout is consumed by a shell.
pub fn note(label: &str, message: impl Display) {
    write_status(StatusKind::Info, Stream::Stderr, label, &message.to_string());
}

pub fn info(message: impl Display) {
    let kind = StatusKind::Info;
    write_status(kind, default_stream(kind), "Info", &message.to_string());
}

pub fn warn(message: impl Display) {
    let kind = StatusKind::Warn;
    write_status(kind, default_stream(kind), "Warning", &message.to_string());
}

pub fn error(message: impl Display) {
    let kind = StatusKind::Error;
    write_status(kind, default_stream(kind), "Error", &message.to_string());
}

pub fn success(label: &str, message: impl Display) {
    let kind = StatusKind::Success;
    write_status(kind, default_stream(kind), label, &message.to_string());
}
