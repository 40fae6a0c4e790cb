use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use ecoshare::storage::{BillType, EcoCertification, FoodType, PurchaseMode};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ecoshare")]
#[command(about = "Surplus-food sharing and green-score tracking")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, global = true, default_value = "config/default")]
    pub config: String,

    /// Bearer token identifying the acting user
    #[arg(short, long, global = true, env = "ECOSHARE_TOKEN", hide_env_values = true)]
    pub token: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize database and configuration
    Init,

    /// Register a user and print their token
    Register {
        /// Display name shown on the leaderboard
        name: String,
    },

    /// List a new food donation
    Donate(DonateArgs),

    /// Show donations available for pickup
    List {
        /// Output format (table, json)
        #[arg(short, long, default_value = "table")]
        format: String,
    },

    /// Show every donation you have listed
    Mine,

    /// Claim an available donation
    Claim {
        /// Donation id
        id: String,
    },

    /// Withdraw one of your unclaimed donations
    Remove {
        /// Donation id
        id: String,

        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Extract receipt fields from transcribed receipt text
    Extract {
        /// Text files produced by OCR
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Submit a receipt for green score
    Submit(SubmitArgs),

    /// Show a user's green score and badge (defaults to you)
    Score {
        user_id: Option<String>,
    },

    /// Show your receipt submission history
    History,

    /// Show the green-score leaderboard
    Leaderboard {
        /// Number of entries to show
        #[arg(short = 'n', long)]
        top: Option<usize>,

        /// Output format (table, json)
        #[arg(short, long, default_value = "table")]
        format: String,
    },

    /// Community blog posts
    Blog {
        #[command(subcommand)]
        action: BlogCommands,
    },

    /// Comments on blog posts
    Comment {
        #[command(subcommand)]
        action: CommentCommands,
    },

    /// Show statistics
    Stats {
        /// Output format: table or json
        #[arg(short, long, default_value = "table")]
        format: String,
    },
}

#[derive(Subcommand)]
pub enum BlogCommands {
    /// Publish a new post
    Post {
        #[arg(long)]
        title: String,

        /// Post body
        #[arg(long)]
        content: String,

        /// URL of an already uploaded cover image
        #[arg(long)]
        image_ref: Option<String>,
    },

    /// List posts, newest first
    List {
        /// Output format (table, json)
        #[arg(short, long, default_value = "table")]
        format: String,
    },

    /// Show a post with its comments
    Show {
        id: String,
    },

    /// Delete one of your posts
    Delete {
        id: String,

        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
pub enum CommentCommands {
    /// Comment on a post
    Add {
        post_id: String,
        text: String,
    },

    /// Delete one of your comments
    Delete {
        post_id: String,
        comment_id: String,
    },
}

#[derive(Args)]
pub struct DonateArgs {
    /// Donor's full name
    #[arg(long)]
    pub full_name: String,

    /// Contact phone number
    #[arg(long)]
    pub contact: String,

    /// Perishable, Non-perishable or None
    #[arg(long, default_value = "Perishable")]
    pub food_type: FoodType,

    /// What is being donated
    #[arg(long)]
    pub item: String,

    /// Weight in kilograms
    #[arg(long)]
    pub weight: Option<f64>,

    /// Cooking date (YYYY-MM-DD)
    #[arg(long)]
    pub cooking_date: NaiveDate,

    /// Expiry date (YYYY-MM-DD)
    #[arg(long)]
    pub expiry_date: NaiveDate,

    /// Storage instructions for the receiver
    #[arg(long, default_value = "")]
    pub storage: String,

    /// Where the food can be picked up
    #[arg(long)]
    pub pickup_address: String,

    /// URL of an already uploaded photo
    #[arg(long)]
    pub image_ref: Option<String>,
}

#[derive(Args)]
pub struct SubmitArgs {
    /// Transcribed receipt text to extract fields from
    #[arg(long)]
    pub text_file: Option<PathBuf>,

    /// Purchase Bill or Consumable Bill
    #[arg(long)]
    pub bill_type: BillType,

    /// Online, Offline or Local Store
    #[arg(long)]
    pub purchase_mode: PurchaseMode,

    /// None, USDA Organic, Energy Star or Fair Trade
    #[arg(long, default_value = "None")]
    pub eco_certification: EcoCertification,

    /// Override the extracted bill number
    #[arg(long)]
    pub bill_number: Option<String>,

    /// Override the extracted item
    #[arg(long)]
    pub item: Option<String>,

    /// Override the extracted vendor
    #[arg(long)]
    pub vendor: Option<String>,

    /// Override the extracted total amount
    #[arg(long)]
    pub amount: Option<String>,

    /// Override the extracted purchase date (YYYY-MM-DD)
    #[arg(long)]
    pub purchase_date: Option<String>,
}
