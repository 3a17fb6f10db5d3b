use anyhow::Result;
use colored::Colorize;
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::future::Future;
use std::time::Duration;

const SPINNER_TICKS_BRAILLE: [&str; 8] = ["⠁", "⠂", "⠄", "⡀", "⢀", "⠠", "⠐", "⠈"];
const SPINNER_TEMPLATE: &str = "{spinner:.cyan.bold} {msg}";

const STAGE_TOTAL: u8 = 3;

#[derive(Clone, Copy)]
pub enum Stage {
    Load,
    Compile,
    Save,
}

impl Stage {
    const fn index(self) -> u8 {
        match self {
            Self::Load => 1,
            Self::Compile => 2,
            Self::Save => 3,
        }
    }

    const fn label(self) -> &'static str {
        match self {
            Self::Load => "Loading",
            Self::Compile => "Compiling",
            Self::Save => "Saving",
        }
    }
}

pub struct ProgressState {
    multi: MultiProgress,
    style: ProgressStyle,
}

impl ProgressState {
    pub(crate) fn new() -> Self {
        let multi = MultiProgress::new();
        multi.set_draw_target(ProgressDrawTarget::stderr_with_hz(15));
        let style = ProgressStyle::with_template(SPINNER_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&SPINNER_TICKS_BRAILLE);
        Self { multi, style }
    }

    fn spinner(&self, message: String) -> ProgressBar {
        let bar = self.multi.add(ProgressBar::new_spinner());
        bar.set_style(self.style.clone());
        bar.set_message(message);
        bar.enable_steady_tick(Duration::from_millis(100));
        bar
    }

    pub(crate) fn clear(&self) {
        let _ = self.multi.clear();
    }
}

/// Spinners are pointless when nobody can see the redraws.
pub fn progress_enabled(no_progress: bool) -> bool {
    !no_progress && !is_dumb_term()
}

fn is_dumb_term() -> bool {
    std::env::var("TERM").is_ok_and(|term| term.eq_ignore_ascii_case("dumb"))
}

fn format_stage_message(stage: Stage, label: &str) -> String {
    let prefix = format!("[{}/{}]", stage.index(), STAGE_TOTAL);
    format!(
        "{} {}: {}",
        prefix.bright_yellow().bold(),
        stage.label().bright_cyan().bold(),
        label.bright_white().bold()
    )
}

/// Runs `fut` under a stage spinner; without a progress state it just awaits.
pub async fn run_with_spinner<T>(
    progress: Option<&ProgressState>,
    stage: Stage,
    label: &str,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    let Some(progress) = progress else {
        return fut.await;
    };

    let bar = progress.spinner(format_stage_message(stage, label));
    let result = fut.await;
    let outcome = if result.is_ok() {
        "done".bright_green().bold()
    } else {
        "failed".bright_red().bold()
    };
    bar.finish_with_message(format!("{} {outcome}", format_stage_message(stage, label)));
    result
}
