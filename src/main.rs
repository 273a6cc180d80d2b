//! AFL tipping CLI
//!
//! Builds causal feature data sets from match history, trains the score network
//! and tips upcoming rounds.

use clap::{Parser, Subcommand};
use tipper::{Config, Result};

#[derive(Parser)]
#[command(name = "tipper")]
#[command(about = "AFL match tipping from windowed match history", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new project with default config
    Init,
    /// Data management commands
    Data {
        #[command(subcommand)]
        action: DataCommands,
    },
    /// List the available interpretation schemes
    Schemes,
    /// Build a training data set and write it as JSON
    Dataset {
        /// First season to include
        #[arg(long)]
        from_year: Option<i32>,
        /// First round of the first season
        #[arg(long, default_value = "1")]
        from_round: u32,
        /// Stop at the round after this date (YYYY-MM-DD); defaults to the whole league
        #[arg(long)]
        until: Option<String>,
        /// Override the configured scheme
        #[arg(long)]
        scheme: Option<String>,
        /// Output file
        #[arg(short, long, default_value = "data/dataset.json")]
        output: String,
    },
    /// Train the score network
    Train {
        /// Train from a data set file instead of building one from the league
        #[arg(long)]
        data: Option<String>,
        /// First season to train on when building from the league
        #[arg(long)]
        from_year: Option<i32>,
        /// Override number of epochs
        #[arg(long)]
        epochs: Option<usize>,
        /// Override learning rate
        #[arg(long)]
        lr: Option<f64>,
    },
    /// Tip every match of a round
    Predict {
        /// Season year
        #[arg(long)]
        year: i32,
        /// Round number
        #[arg(long)]
        round: u32,
        /// Only show matches involving this team
        #[arg(long)]
        team: Option<String>,
        /// Output format
        #[arg(long, default_value = "table")]
        format: OutputFormat,
    },
    /// Tip the first round starting after a date
    PredictNext {
        /// Date (YYYY-MM-DD); defaults to now
        #[arg(long)]
        date: Option<String>,
        /// Output format
        #[arg(long, default_value = "table")]
        format: OutputFormat,
    },
}

#[derive(Subcommand)]
enum DataCommands {
    /// Show league status
    Status,
    /// Write the reference catalog as JSON
    Catalog {
        /// Output path
        output: String,
    },
}

#[derive(Clone, Debug)]
enum OutputFormat {
    Table,
    Json,
    Csv,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(format!("Unknown format: {}. Use table, json, or csv.", s)),
        }
    }
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Load or create config
    let config = if std::path::Path::new(&cli.config).exists() {
        match Config::load(&cli.config) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error loading config: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        Config::default()
    };

    let result = match cli.command {
        Commands::Init => commands::init(&cli.config),
        Commands::Data { action } => match action {
            DataCommands::Status => commands::data_status(&config),
            DataCommands::Catalog { output } => commands::data_catalog(&config, &output),
        },
        Commands::Schemes => commands::schemes(&config),
        Commands::Dataset {
            from_year,
            from_round,
            until,
            scheme,
            output,
        } => commands::dataset(&config, from_year, from_round, until, scheme, &output),
        Commands::Train {
            data,
            from_year,
            epochs,
            lr,
        } => commands::train(&config, data, from_year, epochs, lr),
        Commands::Predict {
            year,
            round,
            team,
            format,
        } => commands::predict(&config, year, round, team, format),
        Commands::PredictNext { date, format } => commands::predict_next(&config, date, format),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

mod commands {
    use super::*;
    use burn::backend::NdArray;
    use chrono::{NaiveDate, NaiveDateTime};
    use std::sync::Arc;
    use tipper::data::{Catalog, DataSet, League, MatchCorpus};
    use tipper::features::{FeatureExtractor, InterpretationScheme, SchemeRegistry};
    use tipper::model::TipperNetConfig;
    use tipper::predict::{NetworkPredictor, Tip, Tipper, WagerRule};
    use tipper::TipperError;

    type MyBackend = NdArray<f32>;

    fn load_catalog(config: &Config) -> Result<Catalog> {
        match &config.data.catalog_path {
            Some(path) => Catalog::load(path),
            None => Ok(Catalog::afl()),
        }
    }

    fn load_league(config: &Config) -> Result<League> {
        let path = &config.data.league_path;
        if !std::path::Path::new(path).exists() {
            return Err(TipperError::Corpus(format!(
                "No league file at {}. Export match history to it first.",
                path
            )));
        }
        League::load(path)
    }

    fn load_scheme(config: &Config, name: Option<&str>) -> Result<InterpretationScheme> {
        let registry = SchemeRegistry::with_definitions(&config.schemes)?;
        let name = name.unwrap_or(config.features.scheme.as_str());
        Ok(registry.get(name)?.clone())
    }

    fn parse_date(date: &str) -> Result<NaiveDateTime> {
        NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map_err(|e| TipperError::Parse(format!("Invalid date '{}': {}", date, e)))?
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| TipperError::Parse(format!("Invalid date '{}'", date)))
    }

    fn first_year(league: &League) -> Result<i32> {
        league
            .seasons
            .first()
            .map(|s| s.year)
            .ok_or_else(|| TipperError::Corpus("League has no seasons".to_string()))
    }

    fn load_tipper(config: &Config) -> Result<Tipper<League>> {
        let league = load_league(config)?;
        let catalog = Arc::new(load_catalog(config)?);
        let scheme = load_scheme(config, None)?;
        let predictor =
            NetworkPredictor::<MyBackend>::load(&config.data.model_path, Default::default())?;

        Ok(Tipper::new(
            league,
            Arc::new(predictor),
            scheme,
            catalog,
            WagerRule::from(&config.wager),
        )?
        .with_feature_settings(config.features.expiry_days, config.features.recent_opponents)
        .with_timeout(config.predict.timeout()))
    }

    pub fn init(config_path: &str) -> Result<()> {
        let config = Config::default();
        config.save(config_path)?;
        println!("Created default config at {}", config_path);

        std::fs::create_dir_all("data")?;
        std::fs::create_dir_all("model")?;
        println!("Created data/ and model/ directories");

        println!("\nNext steps:");
        println!("  1. Edit {} to customize settings", config_path);
        println!("  2. Put match history in {}", config.data.league_path);
        println!("  3. Run 'tipper train' to train the model");
        println!("  4. Run 'tipper predict-next' to tip the coming round");

        Ok(())
    }

    pub fn data_status(config: &Config) -> Result<()> {
        let league = load_league(config)?;
        let stats = league.stats();

        println!("League Status");
        println!("───────────────────────────────");
        println!("  Path:     {}", config.data.league_path);
        println!("  Seasons:  {}", stats.season_count);
        println!("  Rounds:   {}", stats.round_count);
        println!("  Matches:  {}", stats.match_count);
        if let (Some(earliest), Some(latest)) = (stats.earliest_match, stats.latest_match) {
            println!("  Range:    {} to {}", earliest.date(), latest.date());
        }

        let malformed = league.matches().filter(|m| !m.is_well_formed()).count();
        if malformed > 0 {
            println!("  Malformed:{} (skipped when building data)", malformed);
        }

        Ok(())
    }

    pub fn data_catalog(config: &Config, output: &str) -> Result<()> {
        let catalog = load_catalog(config)?;
        catalog.save(output)?;
        println!("Wrote {} teams to {}", catalog.teams().len(), output);
        Ok(())
    }

    pub fn schemes(config: &Config) -> Result<()> {
        let registry = SchemeRegistry::with_definitions(&config.schemes)?;

        println!("{:<20} {:>7}  Tiers", "Scheme", "Inputs");
        println!("{}", "─".repeat(60));
        for scheme in registry.iter() {
            let marker = if scheme.name == config.features.scheme {
                "*"
            } else {
                " "
            };
            println!(
                "{}{:<19} {:>7}  {:?}",
                marker,
                scheme.name,
                scheme.input_len(),
                scheme.tiers
            );
        }

        Ok(())
    }

    fn build_data_set(
        config: &Config,
        league: &League,
        scheme: &InterpretationScheme,
        from_year: Option<i32>,
        from_round: u32,
        until: Option<&str>,
    ) -> Result<DataSet> {
        let catalog = load_catalog(config)?;
        let extractor = FeatureExtractor::from_config(&catalog, &config.features);
        let from_year = match from_year {
            Some(year) => year,
            None => first_year(league)?,
        };
        let from = (from_year, from_round);

        match until {
            Some(date) => tipper::predict::build_data_set_until(
                league,
                &extractor,
                scheme,
                from,
                parse_date(date)?,
            ),
            None => {
                let last = league
                    .all_seasons()?
                    .into_iter()
                    .flat_map(|s| s.rounds)
                    .last()
                    .map(|r| (r.year, r.number))
                    .ok_or_else(|| TipperError::Corpus("League has no rounds".to_string()))?;
                tipper::predict::build_full_data_set(league, &extractor, scheme, from, last)
            }
        }
    }

    pub fn dataset(
        config: &Config,
        from_year: Option<i32>,
        from_round: u32,
        until: Option<String>,
        scheme: Option<String>,
        output: &str,
    ) -> Result<()> {
        let league = load_league(config)?;
        let scheme = load_scheme(config, scheme.as_deref())?;

        let data = build_data_set(
            config,
            &league,
            &scheme,
            from_year,
            from_round,
            until.as_deref(),
        )?;
        data.save(output)?;

        println!(
            "Wrote {} data points ({} inputs, scheme {}) to {}",
            data.len(),
            scheme.input_len(),
            scheme.name,
            output
        );
        Ok(())
    }

    pub fn train(
        config: &Config,
        data: Option<String>,
        from_year: Option<i32>,
        epochs: Option<usize>,
        lr: Option<f64>,
    ) -> Result<()> {
        use burn::backend::Autodiff;
        use tipper::training::train_network;

        type MyAutodiffBackend = Autodiff<MyBackend>;

        let scheme = load_scheme(config, None)?;
        let data = match data {
            Some(path) => {
                let data = DataSet::load(&path)?;
                println!("Loaded {} data points from {}", data.len(), path);
                data
            }
            None => {
                let league = load_league(config)?;
                build_data_set(config, &league, &scheme, from_year, 1, None)?
            }
        };

        if data.scheme != scheme.name {
            log::warn!(
                "Data set was built with scheme '{}', config uses '{}'",
                data.scheme,
                scheme.name
            );
        }
        data.check_arity(scheme.input_len(), scheme.output_len())?;

        let mut training = config.training.clone();
        if let Some(e) = epochs {
            training.epochs = e;
        }
        if let Some(lr) = lr {
            training.learning_rate = lr;
        }

        println!(
            "Training on {} data points ({} inputs, hidden {:?})",
            data.len(),
            scheme.input_len(),
            config.model.hidden_dims
        );

        let device = Default::default();
        let (model, net_config, history) = train_network::<MyAutodiffBackend>(
            data,
            config.model.hidden_dims.clone(),
            &training,
            device,
        )?;

        model.save(&config.data.model_path)?;
        net_config.save(TipperNetConfig::sidecar_path(&config.data.model_path))?;

        println!("\nTraining complete!");
        println!(
            "  Best epoch:      {} (val loss {:.5})",
            history.best_epoch + 1,
            history.best_val_loss
        );
        if let Some(acc) = history.val_accuracies.get(history.best_epoch) {
            println!("  Tip accuracy:    {:.1}%", acc * 100.0);
        }
        println!("  Model saved to:  {}", config.data.model_path);

        Ok(())
    }

    pub fn predict(
        config: &Config,
        year: i32,
        round: u32,
        team: Option<String>,
        format: OutputFormat,
    ) -> Result<()> {
        let tipper = load_tipper(config)?;
        let mut tips = tipper.predict(year, round)?;

        if let Some(name) = team {
            let team = tipper.catalog().find_team(&name)?.id;
            tips.retain(|t| t.reference.home_team == team || t.reference.away_team == team);
        }

        print_tips(&tips, tipper.catalog(), format)
    }

    pub fn predict_next(config: &Config, date: Option<String>, format: OutputFormat) -> Result<()> {
        let date = match date {
            Some(d) => parse_date(&d)?,
            None => chrono::Local::now().naive_local(),
        };

        let tipper = load_tipper(config)?;
        let tips = tipper.predict_next(date)?;
        print_tips(&tips, tipper.catalog(), format)
    }

    fn print_tips(tips: &[Tip], catalog: &Catalog, format: OutputFormat) -> Result<()> {
        match format {
            OutputFormat::Table => {
                match tips.first() {
                    Some(first) => println!("{} Round {}", first.year, first.round),
                    None => println!("No matches to tip"),
                }
                for tip in tips {
                    println!("  {}", tip.report_line(catalog));
                }
                let staked: f64 = tips.iter().map(|t| t.bet).sum();
                if staked > 0.0 {
                    println!("Total staked: ${}", staked);
                }
            }
            OutputFormat::Json => {
                let rows: Vec<serde_json::Value> = tips
                    .iter()
                    .map(|t| {
                        serde_json::json!({
                            "year": t.year,
                            "round": t.round,
                            "date": t.reference.date,
                            "home": catalog.display_name(t.reference.home_team),
                            "away": catalog.display_name(t.reference.away_team),
                            "home_score": t.home,
                            "away_score": t.away,
                            "margin": t.margin,
                            "bet": t.bet,
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&rows)?);
            }
            OutputFormat::Csv => {
                println!(
                    "year,round,date,home,away,home_goals,home_points,home_total,\
                     away_goals,away_points,away_total,margin,bet"
                );
                for t in tips {
                    println!(
                        "{},{},{},{},{},{:.2},{:.2},{:.1},{:.2},{:.2},{:.1},{:.1},{}",
                        t.year,
                        t.round,
                        t.reference.date,
                        catalog.display_name(t.reference.home_team),
                        catalog.display_name(t.reference.away_team),
                        t.home.goals,
                        t.home.points,
                        t.home.total(),
                        t.away.goals,
                        t.away.points,
                        t.away.total(),
                        t.margin,
                        t.bet
                    );
                }
            }
        }
        Ok(())
    }
}
