//! qrstudio command-line entrypoint

use clap::Parser;
use qrstudio::output::RenderedGeneration;
use qrstudio::{
    ContactRecord, FormEdit, FormInput, FormState, Generator, InputMode, QrstudioConfig,
    Session, SessionCommand, SessionEvent, logging, metrics, template,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "qrstudio",
    version,
    about = "Generate styled QR codes for links and contact cards"
)]
struct Cli {
    /// Optional configuration file (toml/yaml). Defaults to qrstudio.{toml,yaml} in cwd/XDG config.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Web address to encode (scheme is added when missing)
    #[arg(long, value_name = "TEXT", conflicts_with = "name")]
    url: Option<String>,

    /// Contact full name; switches to contact mode
    #[arg(long, value_name = "NAME")]
    name: Option<String>,

    /// Contact phone number
    #[arg(long, value_name = "PHONE", requires = "name")]
    phone: Option<String>,

    /// Contact email address
    #[arg(long, value_name = "EMAIL", requires = "name")]
    email: Option<String>,

    /// Contact organization
    #[arg(long, value_name = "ORG", requires = "name")]
    organization: Option<String>,

    /// Color template id (see --list-templates)
    #[arg(long, value_name = "ID")]
    template: Option<String>,

    /// Image to place in the center of the code
    #[arg(long, value_name = "PATH")]
    logo: Option<PathBuf>,

    /// Directory the PNG is written to (overrides config)
    #[arg(long, value_name = "DIR")]
    out: Option<PathBuf>,

    /// Print the PNG as a data URI instead of writing a file
    #[arg(long)]
    data_uri: bool,

    /// Output results as formatted JSON instead of human-readable text
    #[arg(long)]
    json: bool,

    /// List available templates and exit
    #[arg(long)]
    list_templates: bool,

    /// Read edits from stdin and regenerate once input settles
    #[arg(long)]
    interactive: bool,

    /// Quiet period for interactive regeneration, in milliseconds
    #[arg(long, value_name = "MS")]
    debounce_ms: Option<u64>,

    /// Log filter, e.g. `debug` or `qrstudio=trace` (overrides QRSTUDIO_LOG_LEVEL)
    #[arg(long, value_name = "FILTER")]
    log_level: Option<String>,

    /// Also write logs to this file (overrides QRSTUDIO_LOG_FILE)
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    if cli.list_templates {
        list_templates();
        return Ok(ExitCode::SUCCESS);
    }

    let mut config = QrstudioConfig::load(cli.config.as_deref())?;

    if let Some(ref id) = cli.template {
        config.generation.template = id.clone();
    }
    if let Some(ref dir) = cli.out {
        config.generation.output_dir = dir.clone();
    }
    if let Some(ms) = cli.debounce_ms {
        config.generation.debounce_ms = ms;
    }
    if let Some(ref level) = cli.log_level {
        config.logging.level = level.clone();
    }
    if let Some(ref file) = cli.log_file {
        config.logging.file = Some(file.clone());
    }
    config.validate()?;

    let _log_guard = logging::init(&config.logging)?;
    info!(render = ?config.render, template = %config.generation.template, "Starting qrstudio");

    let form = FormState::new(form_input(&cli), config.generation.template.clone());
    let session = Session::new(Generator::from_config(&config), form)
        .with_debounce(config.generation.debounce());

    let code = if cli.interactive {
        run_interactive(session, &config.generation.output_dir, cli.json).await?
    } else {
        run_once(session, &cli, &config.generation.output_dir).await?
    };

    metrics::log_summary();
    Ok(code)
}

fn form_input(cli: &Cli) -> FormInput {
    match &cli.name {
        Some(name) => FormInput::contact(ContactRecord {
            name: name.clone(),
            phone: cli.phone.clone().unwrap_or_default(),
            email: cli.email.clone().unwrap_or_default(),
            organization: cli.organization.clone(),
        }),
        None => FormInput::url(cli.url.clone().unwrap_or_default()),
    }
}

fn list_templates() {
    for category in template::Category::ALL {
        println!("{}:", category.label());
        for t in template::by_category(category) {
            let colors = t.colors();
            println!(
                "  {:<15} {:<16} {} on {}  {}",
                t.id, t.name, colors.dark, colors.light, t.description
            );
        }
    }
}

async fn run_once(mut session: Session, cli: &Cli, out_dir: &Path) -> anyhow::Result<ExitCode> {
    if let Some(ref path) = cli.logo {
        if let Err(err) = session.select_logo(path).await {
            // the code is still generated without the logo
            eprintln!("Warning: {}", err.user_message());
        }
    }

    match session.regenerate().await {
        SessionEvent::Ready { report, .. } => {
            if cli.data_uri {
                if let Some(generated) = session.current() {
                    println!("{}", generated.raster.to_data_uri()?);
                }
                for warning in &report_warnings(&report) {
                    eprintln!("Warning: {warning}");
                }
                return Ok(ExitCode::SUCCESS);
            }

            let path = session.export(out_dir)?;
            emit_report(&report, path.as_deref(), cli.json)?;
            Ok(ExitCode::SUCCESS)
        }
        SessionEvent::Failed { message, .. } => {
            emit_error(&message, cli.json)?;
            Ok(ExitCode::FAILURE)
        }
        other => {
            tracing::warn!(?other, "Unexpected session event");
            Ok(ExitCode::FAILURE)
        }
    }
}

fn report_warnings(report: &RenderedGeneration) -> Vec<String> {
    report.json["warnings"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|w| w.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

fn emit_report(report: &RenderedGeneration, path: Option<&Path>, json: bool) -> anyhow::Result<()> {
    if json {
        let mut value = report.json.clone();
        if let (Some(obj), Some(path)) = (value.as_object_mut(), path) {
            obj.insert(
                "path".to_string(),
                serde_json::Value::String(path.display().to_string()),
            );
        }
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        for line in &report.human {
            println!("{line}");
        }
        if let Some(path) = path {
            println!("  Saved: {}", path.display());
        }
    }
    Ok(())
}

fn emit_error(message: &str, json: bool) -> anyhow::Result<()> {
    if json {
        let payload = serde_json::json!({ "error": message });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        println!("Error: {message}");
    }
    Ok(())
}

const INTERACTIVE_HELP: &str = "\
Commands:
  mode url|contact      switch input mode
  url <text>            set the web address
  name|phone|email|org <text>
                        set a contact field
  template <id>         choose a template
  logo <path>           attach a logo, `logo clear` removes it
  save                  write the current code
  quit                  exit";

const LOGO_USAGE: &str = "usage: logo <path>|clear";

enum Line {
    Command(SessionCommand),
    Quit,
    Skip,
}

fn parse_line(line: &str, out_dir: &Path) -> Result<Line, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(Line::Skip);
    }

    let (verb, rest) = line.split_once(' ').unwrap_or((line, ""));
    let rest = rest.trim().to_string();
    let edit = |edit: FormEdit| -> Result<Line, String> {
        Ok(Line::Command(SessionCommand::Edit(edit)))
    };

    match verb.to_ascii_lowercase().as_str() {
        "quit" | "exit" => Ok(Line::Quit),
        "save" => Ok(Line::Command(SessionCommand::Export(out_dir.to_path_buf()))),
        "mode" => edit(FormEdit::Mode(rest.parse::<InputMode>()?)),
        "url" => edit(FormEdit::Url(rest)),
        "name" => edit(FormEdit::Name(rest)),
        "phone" => edit(FormEdit::Phone(rest)),
        "email" => edit(FormEdit::Email(rest)),
        "org" | "organization" => edit(FormEdit::Organization(rest)),
        "template" => edit(FormEdit::Template(rest)),
        "logo" if rest.eq_ignore_ascii_case("clear") => edit(FormEdit::ClearLogo),
        "logo" if rest.is_empty() => Err(LOGO_USAGE.to_string()),
        "logo" => Ok(Line::Command(SessionCommand::SelectLogo(PathBuf::from(rest)))),
        other => Err(format!("Unknown command '{other}'\n{INTERACTIVE_HELP}")),
    }
}

fn print_event(event: &SessionEvent, json: bool) {
    match event {
        SessionEvent::Ready { report, .. } => {
            if let Err(err) = emit_report(report, None, json) {
                eprintln!("Failed to print result: {err}");
            }
        }
        SessionEvent::Failed { message, .. } | SessionEvent::Rejected { message } => {
            if let Err(err) = emit_error(message, json) {
                eprintln!("Failed to print error: {err}");
            }
        }
        SessionEvent::Discarded { id } => {
            tracing::debug!(request = %id, "Superseded result dropped")
        }
        SessionEvent::Exported { path: Some(path) } => println!("Saved: {}", path.display()),
        SessionEvent::Exported { path: None } => println!("Nothing to save yet"),
    }
}

async fn run_interactive(session: Session, out_dir: &Path, json: bool) -> anyhow::Result<ExitCode> {
    let (command_tx, command_rx) = mpsc::channel(32);
    let (event_tx, mut event_rx) = mpsc::channel(32);

    let runner = tokio::spawn(session.run(command_rx, event_tx));
    let printer = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            print_event(&event, json);
        }
    });

    println!("{INTERACTIVE_HELP}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match parse_line(&line, out_dir) {
            Ok(Line::Command(command)) => {
                if command_tx.send(command).await.is_err() {
                    break;
                }
            }
            Ok(Line::Quit) => break,
            Ok(Line::Skip) => {}
            Err(message) => eprintln!("{message}"),
        }
    }

    drop(command_tx);
    let session = runner.await?;
    printer.await?;

    info!(generated = session.generated_count(), "Session finished");
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_field_edits() {
        let out = Path::new("out");
        match parse_line("url  google.com ", out) {
            Ok(Line::Command(SessionCommand::Edit(FormEdit::Url(url)))) => {
                assert_eq!(url, "google.com")
            }
            _ => panic!("expected url edit"),
        }
        assert!(matches!(
            parse_line("mode contact", out),
            Ok(Line::Command(SessionCommand::Edit(FormEdit::Mode(
                InputMode::Contact
            ))))
        ));
        assert!(matches!(
            parse_line("logo clear", out),
            Ok(Line::Command(SessionCommand::Edit(FormEdit::ClearLogo)))
        ));
    }

    #[test]
    fn parses_control_lines() {
        let out = Path::new("out");
        assert!(matches!(parse_line("", out), Ok(Line::Skip)));
        assert!(matches!(parse_line("quit", out), Ok(Line::Quit)));
        assert!(matches!(
            parse_line("save", out),
            Ok(Line::Command(SessionCommand::Export(dir))) if dir == out
        ));
        assert!(parse_line("mode wifi", out).is_err());
        assert!(parse_line("frobnicate", out).is_err());
    }

    #[test]
    fn bare_logo_explains_usage() {
        let out = Path::new("out");
        assert!(matches!(parse_line("logo", out), Err(msg) if msg == LOGO_USAGE));
        assert!(matches!(parse_line("logo   ", out), Err(msg) if msg == LOGO_USAGE));
        assert!(matches!(
            parse_line("logo brand.png", out),
            Ok(Line::Command(SessionCommand::SelectLogo(path))) if path == Path::new("brand.png")
        ));
    }

    #[test]
    fn cli_accepts_log_overrides() {
        let cli = Cli::try_parse_from([
            "qrstudio",
            "--url",
            "example.com",
            "--log-level",
            "debug",
            "--log-file",
            "logs/qrstudio.log",
        ])
        .unwrap();
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        assert_eq!(cli.log_file.as_deref(), Some(Path::new("logs/qrstudio.log")));
    }
}
