use std::fs;
use std::io::{self, BufRead, ErrorKind, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use gemstudio_contracts::chat::{parse_intent, Intent, CHAT_HELP_COMMANDS};
use gemstudio_contracts::events::EventWriter;
use gemstudio_contracts::operations::{
    is_supported_source_extension, Operation, SOURCE_IMAGE_EXTENSIONS,
};
use gemstudio_engine::{
    ContentProvider, DryrunProvider, GeminiProvider, OperationResult, ProviderConfig, Studio,
};
use image::{DynamicImage, ImageFormat};
use serde_json::{json, Map, Value};

const EXIT_OK: i32 = 0;
const EXIT_REJECTED: i32 = 2;
const EXIT_NO_IMAGE: i32 = 3;

#[derive(Debug, Parser)]
#[command(
    name = "gemstudio",
    version,
    about = "Generate and edit images with Gemini",
    after_help = "Set GOOGLE_API_KEY (https://aistudio.google.com/app/apikey) or pass --dryrun."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Generate an image from a text prompt.
    Generate(GenerateArgs),
    /// Edit an existing PNG or JPEG image with a text prompt.
    Edit(EditArgs),
    /// Interactive session; type /help for commands.
    Chat(ChatArgs),
    /// List the built-in example prompts.
    Examples,
}

#[derive(Debug, Args)]
struct SessionArgs {
    /// Append JSONL events to this file.
    #[arg(long)]
    events: Option<PathBuf>,
    /// Use the offline provider instead of Gemini.
    #[arg(long)]
    dryrun: bool,
}

#[derive(Debug, Parser)]
struct GenerateArgs {
    #[arg(long)]
    prompt: Option<String>,
    #[arg(long)]
    out: Option<PathBuf>,
    #[command(flatten)]
    session: SessionArgs,
}

#[derive(Debug, Parser)]
struct EditArgs {
    #[arg(long)]
    image: PathBuf,
    #[arg(long)]
    prompt: Option<String>,
    #[arg(long)]
    out: Option<PathBuf>,
    #[command(flatten)]
    session: SessionArgs,
}

#[derive(Debug, Parser)]
struct ChatArgs {
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,
    #[command(flatten)]
    session: SessionArgs,
}

fn main() {
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("gemstudio error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Generate(args) => run_generate(args),
        Command::Edit(args) => run_edit(args),
        Command::Chat(args) => {
            run_chat(args)?;
            Ok(EXIT_OK)
        }
        Command::Examples => {
            print_examples(&mut io::stdout())?;
            Ok(EXIT_OK)
        }
    }
}

fn build_studio(session: &SessionArgs) -> Result<Studio> {
    let mut started = Map::new();
    let provider: Box<dyn ContentProvider> = if session.dryrun {
        Box::new(DryrunProvider)
    } else {
        let config = ProviderConfig::from_env()?;
        let provider = GeminiProvider::new(&config)?;
        started.insert("model".to_string(), json!(provider.model()));
        Box::new(provider)
    };
    started.insert("provider".to_string(), json!(provider.name()));

    let session_id = format!("session-{}", uuid::Uuid::new_v4());
    let events = match session.events.as_ref() {
        Some(path) => EventWriter::new(path, session_id),
        None => EventWriter::disabled(session_id),
    };
    events.emit("session_started", started)?;
    Ok(Studio::new(provider, events))
}

fn run_generate(args: GenerateArgs) -> Result<i32> {
    let prompt = args
        .prompt
        .unwrap_or_else(|| Operation::Generate.default_prompt().to_string());
    if accept_prompt(&prompt).is_none() {
        eprintln!("{}", Operation::Generate.blank_prompt_message());
        return Ok(EXIT_REJECTED);
    }
    let studio = build_studio(&args.session)?;
    let out = args
        .out
        .unwrap_or_else(|| PathBuf::from(Operation::Generate.download_file_name()));
    let result = studio.generate(&prompt);
    finish_one_shot(&studio, &result, &out, &mut io::stdout())
}

fn run_edit(args: EditArgs) -> Result<i32> {
    if let Err(message) = check_source_extension(&args.image) {
        eprintln!("{message}");
        return Ok(EXIT_REJECTED);
    }
    let prompt = args
        .prompt
        .unwrap_or_else(|| Operation::Edit.default_prompt().to_string());
    if accept_prompt(&prompt).is_none() {
        eprintln!("{}", Operation::Edit.blank_prompt_message());
        return Ok(EXIT_REJECTED);
    }
    let source = load_source_image(&args.image)?;
    let studio = build_studio(&args.session)?;
    let out = args
        .out
        .unwrap_or_else(|| PathBuf::from(Operation::Edit.download_file_name()));
    let result = studio.edit(&prompt, &source);
    finish_one_shot(&studio, &result, &out, &mut io::stdout())
}

fn finish_one_shot(
    studio: &Studio,
    result: &OperationResult,
    target: &Path,
    out: &mut impl Write,
) -> Result<i32> {
    writeln!(out, "{}", result.status)?;
    match save_result(studio, result, target)? {
        Some(path) => {
            writeln!(out, "Saved {}", path.display())?;
            Ok(EXIT_OK)
        }
        None => Ok(EXIT_NO_IMAGE),
    }
}

/// Blank prompts never reach the studio.
fn accept_prompt(prompt: &str) -> Option<&str> {
    if prompt.trim().is_empty() {
        None
    } else {
        Some(prompt)
    }
}

fn check_source_extension(path: &Path) -> std::result::Result<(), String> {
    let extension = path
        .extension()
        .and_then(|value| value.to_str())
        .unwrap_or_default();
    if is_supported_source_extension(extension) {
        return Ok(());
    }
    Err(format!(
        "Unsupported image type for {} (expected one of: {})",
        path.display(),
        SOURCE_IMAGE_EXTENSIONS.join(", ")
    ))
}

fn load_source_image(path: &Path) -> Result<DynamicImage> {
    image::open(path).with_context(|| format!("failed reading image {}", path.display()))
}

fn save_result(studio: &Studio, result: &OperationResult, out: &Path) -> Result<Option<PathBuf>> {
    let Some(image) = result.image.as_ref() else {
        return Ok(None);
    };
    if let Some(parent) = out.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed creating {}", parent.display()))?;
    }
    image
        .save_with_format(out, ImageFormat::Png)
        .with_context(|| format!("failed to save {}", out.display()))?;
    let mut payload = Map::new();
    payload.insert("operation".to_string(), json!(result.operation.name()));
    payload.insert("path".to_string(), json!(out.to_string_lossy()));
    if let Err(err) = studio.events().emit("image_saved", payload) {
        eprintln!("gemstudio warning: failed writing image_saved event: {err:#}");
    }
    Ok(Some(out.to_path_buf()))
}

fn print_examples(out: &mut impl Write) -> io::Result<()> {
    for (operation, heading, command) in [
        (Operation::Generate, "Generate examples", "/example"),
        (Operation::Edit, "Edit examples", "/edit_example"),
    ] {
        writeln!(out, "{heading} ({command} <n>):")?;
        for (idx, example) in operation.examples().iter().enumerate() {
            writeln!(out, "  {}. {}: {}", idx + 1, example.label, example.prompt)?;
        }
    }
    Ok(())
}

struct ChatState {
    out_dir: PathBuf,
    source: Option<(PathBuf, DynamicImage)>,
    saved_count: u64,
}

impl ChatState {
    fn new(out_dir: PathBuf) -> Self {
        Self {
            out_dir,
            source: None,
            saved_count: 0,
        }
    }

    fn next_output_path(&mut self, operation: Operation) -> PathBuf {
        self.saved_count += 1;
        let file_name = operation.download_file_name();
        let stem = file_name.strip_suffix(".png").unwrap_or(file_name);
        self.out_dir.join(format!("{stem}-{}.png", self.saved_count))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChatFlow {
    Continue,
    Quit,
}

fn run_chat(args: ChatArgs) -> Result<()> {
    let studio = build_studio(&args.session)?;
    let mut state = ChatState::new(args.out_dir);
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut line = String::new();

    writeln!(stdout, "gemstudio chat started. Type /help for commands.")?;
    let events = studio.events();
    if let Some(path) = events.path() {
        writeln!(
            stdout,
            "Logging {} events to {}",
            events.session_id(),
            path.display()
        )?;
    }

    loop {
        write!(stdout, "> ")?;
        stdout.flush()?;

        line.clear();
        let read = match stdin.lock().read_line(&mut line) {
            Ok(read) => read,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err.into()),
        };
        if read == 0 {
            break;
        }

        let intent = parse_intent(line.trim_end_matches(['\n', '\r']));
        if handle_intent(&studio, &mut state, &intent, &mut stdout)? == ChatFlow::Quit {
            break;
        }
    }
    Ok(())
}

fn handle_intent(
    studio: &Studio,
    state: &mut ChatState,
    intent: &Intent,
    out: &mut impl Write,
) -> Result<ChatFlow> {
    match intent.action.as_str() {
        "noop" => {}
        "quit" => return Ok(ChatFlow::Quit),
        "help" => writeln!(out, "Commands: {}", CHAT_HELP_COMMANDS.join(" "))?,
        "list_examples" => print_examples(out)?,
        "generate" => {
            let prompt = intent.prompt.as_deref().unwrap_or_default();
            chat_generate(studio, state, prompt, out)?;
        }
        "edit" => {
            let prompt = intent.prompt.as_deref().unwrap_or_default();
            chat_edit(studio, state, prompt, out)?;
        }
        "generate_example" | "edit_example" => {
            let operation = if intent.action == "generate_example" {
                Operation::Generate
            } else {
                Operation::Edit
            };
            let example = intent
                .command_args
                .get("number")
                .and_then(Value::as_u64)
                .and_then(|number| operation.example(number as usize));
            let Some(example) = example else {
                writeln!(
                    out,
                    "Pick an example between 1 and {} (see /examples)",
                    operation.examples().len()
                )?;
                return Ok(ChatFlow::Continue);
            };
            writeln!(out, "{}: {}", example.label, example.prompt)?;
            match operation {
                Operation::Generate => chat_generate(studio, state, example.prompt, out)?,
                Operation::Edit => chat_edit(studio, state, example.prompt, out)?,
            }
        }
        "set_source_image" => {
            let path_text = intent
                .command_args
                .get("path")
                .and_then(Value::as_str)
                .unwrap_or_default();
            if path_text.is_empty() {
                writeln!(out, "/use requires a path")?;
                return Ok(ChatFlow::Continue);
            }
            let path = PathBuf::from(path_text);
            if let Err(message) = check_source_extension(&path) {
                writeln!(out, "{message}")?;
                return Ok(ChatFlow::Continue);
            }
            match load_source_image(&path) {
                Ok(image) => {
                    writeln!(
                        out,
                        "Source image set to {} ({}x{})",
                        path.display(),
                        image.width(),
                        image.height()
                    )?;
                    state.source = Some((path, image));
                }
                Err(err) => writeln!(out, "Could not open image: {err:#}")?,
            }
        }
        "set_out_dir" => {
            let path_text = intent
                .command_args
                .get("path")
                .and_then(Value::as_str)
                .unwrap_or_default();
            if path_text.is_empty() {
                writeln!(out, "/out requires a directory")?;
            } else {
                state.out_dir = PathBuf::from(path_text);
                writeln!(out, "Saving results to {}", state.out_dir.display())?;
            }
        }
        _ => {
            let command = intent
                .command_args
                .get("command")
                .and_then(Value::as_str)
                .unwrap_or(intent.raw.as_str());
            writeln!(out, "Unknown command /{command}. Type /help for commands.")?;
        }
    }
    Ok(ChatFlow::Continue)
}

fn chat_generate(
    studio: &Studio,
    state: &mut ChatState,
    prompt: &str,
    out: &mut impl Write,
) -> Result<()> {
    let Some(prompt) = accept_prompt(prompt) else {
        writeln!(out, "{}", Operation::Generate.blank_prompt_message())?;
        return Ok(());
    };
    writeln!(out, "Generating your image... This may take a moment.")?;
    let result = studio.generate(prompt);
    report_chat_result(studio, state, &result, out)
}

fn chat_edit(
    studio: &Studio,
    state: &mut ChatState,
    prompt: &str,
    out: &mut impl Write,
) -> Result<()> {
    let Some((_, source)) = state.source.as_ref() else {
        writeln!(out, "Please upload an image first with /use <path>.")?;
        return Ok(());
    };
    let Some(prompt) = accept_prompt(prompt) else {
        writeln!(out, "{}", Operation::Edit.blank_prompt_message())?;
        return Ok(());
    };
    writeln!(out, "Editing your image... This may take a moment.")?;
    let result = studio.edit(prompt, source);
    report_chat_result(studio, state, &result, out)
}

fn report_chat_result(
    studio: &Studio,
    state: &mut ChatState,
    result: &OperationResult,
    out: &mut impl Write,
) -> Result<()> {
    if result.has_image() {
        let path = state.next_output_path(result.operation);
        match save_result(studio, result, &path) {
            Ok(Some(saved)) => writeln!(out, "Saved {}", saved.display())?,
            Ok(None) => {}
            Err(err) => writeln!(out, "Could not save image: {err:#}")?,
        }
    }
    writeln!(out, "{}", result.status)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use anyhow::{bail, Result};
    use gemstudio_contracts::chat::parse_intent;
    use gemstudio_contracts::events::EventWriter;
    use gemstudio_contracts::parts::ProviderResponse;
    use gemstudio_engine::{ContentProvider, ContentRequest, DryrunProvider, Studio};
    use image::{DynamicImage, GenericImageView, RgbImage};

    use super::{
        accept_prompt, chat_generate, check_source_extension, finish_one_shot, handle_intent,
        print_examples, ChatFlow, ChatState, EXIT_OK,
    };

    struct CountingProvider {
        calls: Arc<AtomicUsize>,
    }

    impl ContentProvider for CountingProvider {
        fn name(&self) -> &str {
            "counting"
        }

        fn generate_content(&self, _request: &ContentRequest) -> Result<ProviderResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            bail!("operation timed out")
        }
    }

    fn dryrun_studio() -> Studio {
        Studio::new(Box::new(DryrunProvider), EventWriter::disabled("session-test"))
    }

    fn run_lines(studio: &Studio, state: &mut ChatState, lines: &[&str]) -> Result<String> {
        let mut out = Vec::new();
        for line in lines {
            if handle_intent(studio, state, &parse_intent(line), &mut out)? == ChatFlow::Quit {
                break;
            }
        }
        Ok(String::from_utf8(out)?)
    }

    #[test]
    fn blank_prompt_never_reaches_provider() -> Result<()> {
        let calls = Arc::new(AtomicUsize::new(0));
        let studio = Studio::new(
            Box::new(CountingProvider {
                calls: Arc::clone(&calls),
            }),
            EventWriter::disabled("session-test"),
        );
        let temp = tempfile::tempdir()?;
        let mut state = ChatState::new(temp.path().to_path_buf());
        let mut out = Vec::new();

        assert!(accept_prompt("").is_none());
        assert!(accept_prompt(" \n\t").is_none());
        chat_generate(&studio, &mut state, "", &mut out)?;
        run_lines(&studio, &mut state, &["/generate   "])?;

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(String::from_utf8(out)?.contains("Please enter a description for your image."));
        assert_eq!(std::fs::read_dir(temp.path())?.count(), 0);
        Ok(())
    }

    #[test]
    fn failed_generation_prints_status_and_saves_nothing() -> Result<()> {
        let calls = Arc::new(AtomicUsize::new(0));
        let studio = Studio::new(
            Box::new(CountingProvider {
                calls: Arc::clone(&calls),
            }),
            EventWriter::disabled("session-test"),
        );
        let temp = tempfile::tempdir()?;
        let mut state = ChatState::new(temp.path().to_path_buf());
        let output = run_lines(&studio, &mut state, &["a red circle on white background"])?;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(output.contains("Error generating image: operation timed out"));
        assert_eq!(std::fs::read_dir(temp.path())?.count(), 0);
        Ok(())
    }

    #[test]
    fn chat_generates_and_saves_numbered_png() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let studio = dryrun_studio();
        let mut state = ChatState::new(temp.path().join("renders"));
        let output = run_lines(&studio, &mut state, &["/example 1", "boat at dusk"])?;

        assert!(output.contains("Mountain sunrise"));
        assert!(output.contains("Image generated successfully!"));
        let first = temp.path().join("renders").join("generated_image-1.png");
        let second = temp.path().join("renders").join("generated_image-2.png");
        assert_eq!(image::open(&first)?.dimensions(), (512, 512));
        assert!(second.exists());
        Ok(())
    }

    #[test]
    fn chat_save_failure_keeps_session_running() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let blocker = temp.path().join("blocker");
        std::fs::write(&blocker, b"not a directory")?;

        let studio = dryrun_studio();
        let mut state = ChatState::new(temp.path().to_path_buf());
        let out_line = format!("/out {}", blocker.join("sub").display());
        let output = run_lines(
            &studio,
            &mut state,
            &[out_line.as_str(), "boat at dusk", "/help"],
        )?;

        let save_error = output.find("Could not save image: failed creating");
        let status = output.find("Image generated successfully!");
        assert!(save_error.is_some());
        assert!(status > save_error);
        assert!(output.contains("Commands: "));
        Ok(())
    }

    #[test]
    fn one_shot_prints_status_before_saving() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let blocker = temp.path().join("blocker");
        std::fs::write(&blocker, b"not a directory")?;
        let studio = dryrun_studio();
        let result = studio.generate("boat at dusk");

        let mut out = Vec::new();
        let failed = finish_one_shot(&studio, &result, &blocker.join("out.png"), &mut out);
        assert!(failed.is_err());
        assert_eq!(String::from_utf8(out)?, "Image generated successfully!\n");

        let target = temp.path().join("boat.png");
        let mut out = Vec::new();
        assert_eq!(finish_one_shot(&studio, &result, &target, &mut out)?, EXIT_OK);
        let printed = String::from_utf8(out)?;
        assert!(printed.starts_with("Image generated successfully!\nSaved "));
        assert!(target.exists());
        Ok(())
    }

    #[test]
    fn chat_edit_requires_uploaded_source() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let source_path = temp.path().join("photo one.png");
        DynamicImage::ImageRgb8(RgbImage::new(9, 4)).save(&source_path)?;

        let studio = dryrun_studio();
        let mut state = ChatState::new(temp.path().to_path_buf());
        let before = run_lines(&studio, &mut state, &["/edit make it night"])?;
        assert!(before.contains("Please upload an image first"));

        let use_line = format!("/use \"{}\"", source_path.display());
        let output = run_lines(
            &studio,
            &mut state,
            &[use_line.as_str(), "/edit", "/edit make it night"],
        )?;
        assert!(output.contains("Source image set to"));
        assert!(output.contains("Please describe how you want to edit the image."));
        assert!(output.contains("Image edited successfully!"));
        let edited = image::open(temp.path().join("edited_image-1.png"))?;
        assert_eq!(edited.dimensions(), (9, 4));
        Ok(())
    }

    #[test]
    fn chat_rejects_unsupported_uploads_and_unknown_commands() -> Result<()> {
        let studio = dryrun_studio();
        let mut state = ChatState::new(Path::new(".").to_path_buf());
        let output = run_lines(
            &studio,
            &mut state,
            &["/use anim.gif", "/upscale 4x", "/example 9", "/quit", "never parsed"],
        )?;
        assert!(output.contains("Unsupported image type for anim.gif"));
        assert!(output.contains("Unknown command /upscale"));
        assert!(output.contains("Pick an example between 1 and 4"));
        assert!(state.source.is_none());
        assert_eq!(state.saved_count, 0);
        Ok(())
    }

    #[test]
    fn source_extension_check_is_case_insensitive() {
        assert!(check_source_extension(Path::new("a/b/photo.JPG")).is_ok());
        assert!(check_source_extension(Path::new("photo.jpeg")).is_ok());
        assert!(check_source_extension(Path::new("photo")).is_err());
        assert!(check_source_extension(Path::new("photo.webp")).is_err());
    }

    #[test]
    fn examples_listing_numbers_both_operations() -> Result<()> {
        let mut out = Vec::new();
        print_examples(&mut out)?;
        let text = String::from_utf8(out)?;
        assert!(text.contains("Generate examples (/example <n>):"));
        assert!(text.contains("  4. Magic forest: A magical forest with glowing mushrooms and fairy lights"));
        assert!(text.contains("Edit examples (/edit_example <n>):"));
        assert!(text.contains("  1. Snowy weather: Change the weather to snowy winter with falling snow"));
        Ok(())
    }
}
