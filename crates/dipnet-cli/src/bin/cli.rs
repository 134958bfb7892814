use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use dipnet_cli::*;
use dipnet_core::{Amount, BusinessId};

#[derive(Parser)]
#[command(name = "dipnet")]
#[command(about = "DIPNET network commission engine", long_about = None)]
struct Cli {
    /// Member dataset (JSON array)
    #[arg(long, global = true)]
    members: Option<PathBuf>,

    /// Engine configuration file (TOML, YAML or JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Commission breakdown for a price
    Breakdown {
        /// Sale price in whole units, up to two decimals
        #[arg(long)]
        price: Amount,
        /// Sponsor credited with the sale (generation 1)
        #[arg(long)]
        sponsor: Option<BusinessId>,
        #[arg(long)]
        stockist: Option<BusinessId>,
    },

    /// Breakdown of one sale from a sales file
    Sale {
        #[arg(long)]
        sales: PathBuf,
        id: u64,
    },

    /// Sponsor chain above a member
    Upline { member: BusinessId },

    /// Members recruited below a member
    Downline {
        member: BusinessId,
        #[arg(long)]
        depth: Option<usize>,
    },

    /// Per-member earnings over a sales file
    Statement {
        #[arg(long)]
        sales: PathBuf,
    },

    /// Freeze breakdowns of unrecorded sales into a ledger file
    Record {
        #[arg(long)]
        sales: PathBuf,
        #[arg(long)]
        ledger: PathBuf,
    },

    /// Recorded sales whose breakdown has since changed
    Drift {
        #[arg(long)]
        sales: PathBuf,
        #[arg(long)]
        ledger: PathBuf,
    },

    /// Print the effective engine configuration
    Config,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let mut econ = open_engine(cli.members.as_deref(), cli.config.as_deref())?;

    let output = match cli.command {
        Commands::Breakdown {
            price,
            sponsor,
            stockist,
        } => {
            info!("Quoting {}", price);
            render(&quote(&econ, price, sponsor, stockist)?, cli.pretty)?
        }
        Commands::Sale { sales, id } => {
            let sales = load_sales(&sales)?;
            render(&sale_breakdown(&econ, &sales, id)?, cli.pretty)?
        }
        Commands::Upline { member } => render(&upline_report(&econ, &member)?, cli.pretty)?,
        Commands::Downline { member, depth } => {
            render(&downline_report(&econ, &member, depth)?, cli.pretty)?
        }
        Commands::Statement { sales } => {
            let sales = load_sales(&sales)?;
            render(&statement(&econ, &sales)?, cli.pretty)?
        }
        Commands::Record { sales, ledger } => {
            let sales = load_sales(&sales)?;
            render(&record_sales(&mut econ, &sales, &ledger)?, cli.pretty)?
        }
        Commands::Drift { sales, ledger } => {
            let sales = load_sales(&sales)?;
            render(&drift_report(&mut econ, &sales, &ledger)?, cli.pretty)?
        }
        Commands::Config => render(&econ.config, cli.pretty)?,
    };

    println!("{}", output);
    Ok(())
}
