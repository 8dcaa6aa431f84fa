use std::path::Path;
use std::sync::Arc;

use log::{info, warn};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::api::HttpOptionSource;
use crate::config::Settings;
use crate::errors::{FilterError, FilterResult};
use crate::filters::{status_line, BrandMatcher, DatePreset, FilterCommand, FilterStateManager};

/// One parsed console line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleInput {
    Command(FilterCommand),
    Show,
    Quit,
}

/// Parse `preset last_7d`, `range 2024-01-01 2024-01-31`, `campaign 123`, ...
pub fn parse_line(line: &str) -> FilterResult<Option<ConsoleInput>> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };
    let arg = words.next();

    let missing = || FilterError::InvalidCommand(format!("'{}' needs an argument", verb));
    let input = match verb {
        "preset" => {
            let preset: DatePreset = arg.ok_or_else(missing)?.parse()?;
            ConsoleInput::Command(FilterCommand::SetDatePreset(preset))
        }
        "range" => {
            let from = arg.ok_or_else(missing)?;
            let to = words.next().ok_or_else(missing)?;
            ConsoleInput::Command(FilterCommand::SetCustomDateRange {
                from: from.to_string(),
                to: to.to_string(),
            })
        }
        "brand" => ConsoleInput::Command(FilterCommand::SetBrand(arg.ok_or_else(missing)?.to_string())),
        "campaign" => {
            ConsoleInput::Command(FilterCommand::SetCampaign(arg.ok_or_else(missing)?.to_string()))
        }
        "adset" => ConsoleInput::Command(FilterCommand::SetAdset(arg.ok_or_else(missing)?.to_string())),
        "ad" => ConsoleInput::Command(FilterCommand::SetAd(arg.ok_or_else(missing)?.to_string())),
        "apply" => ConsoleInput::Command(FilterCommand::Apply),
        "reset" => ConsoleInput::Command(FilterCommand::Reset),
        "show" => ConsoleInput::Show,
        "quit" | "exit" => ConsoleInput::Quit,
        other => {
            return Err(FilterError::InvalidCommand(format!("unknown verb '{}'", other)));
        }
    };
    Ok(Some(input))
}

/// Runs the filter manager against the configured backend
pub struct FilterRunner {
    config: Settings,
}

impl FilterRunner {
    /// Create a new runner from a configuration file
    pub fn new(config_path: impl AsRef<Path>) -> FilterResult<Self> {
        let path = config_path.as_ref().to_string_lossy();
        let config = Settings::new(&path)?;
        Ok(Self { config })
    }

    pub fn from_settings(config: Settings) -> Self {
        Self { config }
    }

    /// Build a manager wired to the HTTP backend
    pub fn build_manager(&self) -> FilterResult<FilterStateManager> {
        let source = Arc::new(HttpOptionSource::new(&self.config.api)?);
        info!("Using dashboard backend at {}", source.base_url());
        let brands = BrandMatcher::new(self.config.filters.brands.iter().cloned());
        Ok(FilterStateManager::new(source, brands))
    }

    /// Read commands line by line from stdin until EOF or `quit`
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        // 1. Setup Logging
        if std::env::var("RUST_LOG").is_err() {
            std::env::set_var("RUST_LOG", &self.config.log.level);
        }
        env_logger::try_init().ok();

        info!("Starting FilterRunner...");

        // 2. Manager + initial data
        let manager = self.build_manager()?;
        manager.subscribe(|params, snapshot| {
            let pairs: Vec<String> = params
                .to_pairs()
                .into_iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            info!(
                "Filters changed: {} ({} campaigns, {} adsets, {} ads available)",
                pairs.join("&"),
                snapshot.options.campaigns.len(),
                snapshot.options.adsets.len(),
                snapshot.options.ads.len()
            );
        });

        let loaded = manager.load_initial_data().await;
        if loaded == 0 {
            warn!("No campaigns loaded; dropdowns start empty");
        }
        // Broadcast the defaults so every consumer starts from the same state
        manager.apply().await;

        // 3. Command loop
        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        let mut stdout = tokio::io::stdout();
        Self::command_loop(&manager, stdin, &mut stdout).await?;

        info!("FilterRunner stopped");
        Ok(())
    }

    /// Apply console lines to `manager`, echoing the resulting query parameters
    pub async fn command_loop<R, W>(
        manager: &FilterStateManager,
        reader: R,
        writer: &mut W,
    ) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await? {
            let input = match parse_line(&line) {
                Ok(Some(input)) => input,
                Ok(None) => continue,
                Err(e) => {
                    writer.write_all(format!("error: {}\n", e).as_bytes()).await?;
                    continue;
                }
            };

            match input {
                ConsoleInput::Quit => break,
                ConsoleInput::Show => {
                    let active = manager.active_filters().await;
                    writer
                        .write_all(format!("{}\n", status_line(&active)).as_bytes())
                        .await?;
                }
                ConsoleInput::Command(command) => {
                    let outcome = manager.execute(command).await;
                    manager.process_pending().await;
                    let params = manager.query_params().await;
                    let json = serde_json::to_string(&params).unwrap_or_default();
                    writer
                        .write_all(format!("{:?} {}\n", outcome, json).as_bytes())
                        .await?;
                }
            }
        }
        writer.flush().await
    }
}
