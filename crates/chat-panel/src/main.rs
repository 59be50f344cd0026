//! A terminal front-end demonstrating how to use `chat-panel` as a
//! library.

#[macro_use]
extern crate tracing;

use std::io::Write as _;
use std::time::Duration;

use chat_panel::core::{Error, Message, RequestOptions, Role};
use chat_panel::{ChatClient, EnvConfig};
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use tokio::io::{self, AsyncBufReadExt, BufReader, Stdin};

const BAR_CHAR: &str = "▎";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

enum Command {
    Ask(String),
    Retry,
    Reset,
    History,
    Quit,
}

impl Command {
    fn parse(line: &str) -> Option<Self> {
        let command = match line {
            "" => return None,
            "/quit" | "/exit" => Command::Quit,
            "/reset" => Command::Reset,
            "/history" => Command::History,
            "/retry" => Command::Retry,
            _ => Command::Ask(line.to_owned()),
        };
        Some(command)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = match EnvConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            return;
        }
    };
    let system_prompt = config.system_prompt.clone();
    let client = config.connect();
    let options = RequestOptions::default().with_timeout(REQUEST_TIMEOUT);

    let mut stdin = BufReader::new(io::stdin());
    let mut last_input = None;

    loop {
        print!("> ");
        std::io::stdout().flush().ok();

        let Some(line) = read_line(&mut stdin).await else {
            break;
        };
        let Some(command) = Command::parse(line.trim()) else {
            continue;
        };

        let input = match command {
            Command::Ask(input) => input,
            Command::Retry => {
                let Some(input) = last_input.clone() else {
                    println!("{}", "Nothing to retry.".dimmed());
                    continue;
                };
                input
            }
            Command::Reset => {
                match &system_prompt {
                    Some(prompt) => client.reset_with_system_prompt(prompt),
                    None => client.reset(),
                }
                println!("{}", "Conversation cleared.".dimmed());
                continue;
            }
            Command::History => {
                print_transcript(&client.transcript());
                continue;
            }
            Command::Quit => break,
        };

        last_input = Some(input.clone());
        ask(&client, &input, &options).await;
    }
}

async fn ask(client: &ChatClient, input: &str, options: &RequestOptions) {
    let progress_style = ProgressStyle::with_template("{spinner} {wide_msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");
    let progress_bar = ProgressBar::new_spinner();
    progress_bar.set_style(progress_style);
    progress_bar.set_message("🤔 Thinking...");
    progress_bar.enable_steady_tick(Duration::from_millis(100));

    let mut stream = match client.stream_message(input, options).await {
        Ok(stream) => stream,
        Err(err) => {
            progress_bar.finish_and_clear();
            print_error(&err);
            return;
        }
    };

    let mut started = false;
    loop {
        match stream.next_fragment().await {
            Ok(Some(fragment)) => {
                if !started {
                    // Finish the progress bar before printing anything else.
                    progress_bar.finish_and_clear();
                    print!("{}🤖 ", BAR_CHAR.bright_cyan());
                    started = true;
                }
                print!("{}", fragment.bright_white());
                std::io::stdout().flush().ok();
            }
            Ok(None) => break,
            Err(err) => {
                progress_bar.finish_and_clear();
                if started {
                    println!();
                }
                print_error(&err);
                return;
            }
        }
    }

    progress_bar.finish_and_clear();
    if started {
        println!();
    }
    debug!("reply stats: {:?}", stream.stats());
}

fn print_error(err: &Error) {
    let bar = BAR_CHAR.bright_yellow();
    if err.is_rate_limited() {
        println!("{bar}⏳ {}", err.bright_yellow());
    } else {
        println!("{bar}⚠️  {}", err.red());
    }
}

fn print_transcript(transcript: &[Message]) {
    if transcript.is_empty() {
        println!("{}", "The conversation is empty.".dimmed());
        return;
    }
    for msg in transcript {
        match msg.role {
            Role::System => {
                println!("{}⚙️  {}", BAR_CHAR.dimmed(), msg.content.dimmed())
            }
            Role::User => println!("{}🧑 {}", BAR_CHAR.green(), msg.content),
            Role::Assistant => println!(
                "{}🤖 {}",
                BAR_CHAR.bright_cyan(),
                msg.content.bright_white()
            ),
        }
    }
}

async fn read_line(stdin: &mut BufReader<Stdin>) -> Option<String> {
    let mut line = String::new();

    match stdin.read_line(&mut line).await {
        Ok(count) => {
            if count == 0 {
                return None;
            }
            Some(line)
        }
        Err(err) => {
            error!("error reading input: {}", err);
            None
        }
    }
}
