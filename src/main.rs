mod cli;

use clap::Parser;
use cli::{BlogCommands, Cli, CommentCommands, Commands, DonateArgs, SubmitArgs};
use colored::*;
use ecoshare::{
    auth::{self, Credential},
    error::{self, EcoShareError},
    receipt::{self, ReceiptDraft, TextPassthrough},
    storage::{Database, Donation, NewDonation, NewPost, ReceiptField},
    utils, Config, Platform,
};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ecoshare=info")),
        )
        .init();

    let cli = Cli::parse();

    let config = match Config::load(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let credential = Credential::bearer(cli.token.clone().unwrap_or_default());

    let result = match cli.command {
        Commands::Init => initialize(&config),
        Commands::Register { name } => register(&config, &name),
        Commands::Donate(args) => donate(&config, &credential, args),
        Commands::List { format } => list_available(&config, &format),
        Commands::Mine => list_mine(&config, &credential),
        Commands::Claim { id } => {
            info!("Claiming donation {}", id);
            claim(&config, &credential, &id)
        }
        Commands::Remove { id, yes } => remove(&config, &credential, &id, yes),
        Commands::Extract { files } => extract(&config, &files).await,
        Commands::Submit(args) => submit(&config, &credential, args).await,
        Commands::Score { user_id } => show_score(&config, &credential, user_id),
        Commands::History => show_history(&config, &credential),
        Commands::Leaderboard { top, format } => show_leaderboard(&config, top, &format),
        Commands::Blog { action } => blog(&config, &credential, action),
        Commands::Comment { action } => comment(&config, &credential, action),
        Commands::Stats { format } => show_stats(&config, &format),
    };

    match result {
        Ok(()) => {}
        Err(e @ EcoShareError::InvariantViolation(_)) => {
            error!("{}", format!("Fatal: {}", e).red().bold());
            std::process::exit(2);
        }
        Err(e) if e.is_conflict() => {
            // Routine outcome: the listing changed under the caller.
            println!("{}", e.to_string().yellow());
            println!("Run {} to see what is still available.", "ecoshare list".cyan());
            std::process::exit(1);
        }
        Err(e) => {
            error!("{}", format!("Error: {}", e).red());
            std::process::exit(1);
        }
    }
}

fn open_database(config: &Config) -> error::Result<Arc<Database>> {
    Ok(Arc::new(Database::open(&config.database.path, config.busy_timeout())?))
}

fn open_platform(config: &Config) -> error::Result<Platform<Arc<Database>>> {
    Ok(Platform::open(open_database(config)?, config))
}

fn initialize(config: &Config) -> error::Result<()> {
    println!("{}", "Initializing EcoShare...".green());
    let _db = open_database(config)?;
    println!("{}", "✓ Database initialized".green());
    println!("{}", "✓ Configuration loaded".green());
    println!("\n{}", "Configuration:".cyan());
    println!("  Database:       {}", config.database.path);
    println!("  OCR timeout:    {} ms", config.ocr.timeout_ms);
    println!("  Leaderboard:    top {}", config.leaderboard.default_size);

    println!("\n{}", "Ready to use! Try running:".cyan());
    println!("  {} to create a user", "ecoshare register <name>".yellow());
    println!("  {} to browse donations", "ecoshare list".yellow());
    Ok(())
}

fn register(config: &Config, name: &str) -> error::Result<()> {
    let db = open_database(config)?;
    let (identity, token) = auth::register_user(&db, name)?;

    println!("{}", "✓ User registered".green());
    println!("  User id: {}", identity.user_id);
    println!("  Token:   {}", token.cyan());
    println!("\nExport it to act as this user:");
    println!("  {}", format!("export ECOSHARE_TOKEN={}", token).yellow());
    Ok(())
}

fn donate(config: &Config, credential: &Credential, args: DonateArgs) -> error::Result<()> {
    let platform = open_platform(config)?;

    let new = NewDonation {
        full_name: args.full_name,
        contact_number: args.contact,
        food_type: Some(args.food_type),
        item_name: args.item,
        weight: args.weight,
        cooking_date: Some(args.cooking_date),
        expiry_date: Some(args.expiry_date),
        storage_instructions: args.storage,
        pickup_address: args.pickup_address,
        image_ref: args.image_ref,
    };

    let id = platform.create_donation(credential, new)?;
    println!("{}", "✓ Donation listed".green());
    println!("  Id: {}", id);
    Ok(())
}

fn print_donations(donations: &[Donation]) {
    utils::print_table_border(120);
    utils::print_table_row(
        &["Id", "Item", "Type", "Weight", "Expires", "Status", "Pickup"],
        &[36, 20, 14, 8, 10, 9, 20],
    );
    utils::print_table_border(120);

    for d in donations {
        utils::print_table_row(
            &[
                &d.id,
                &d.item_name,
                d.food_type.as_str(),
                &utils::format_weight(d.weight),
                &d.expiry_date.to_string(),
                d.status.as_str(),
                &d.pickup_address,
            ],
            &[36, 20, 14, 8, 10, 9, 20],
        );
    }
    utils::print_table_border(120);
}

fn list_available(config: &Config, format: &str) -> error::Result<()> {
    let platform = open_platform(config)?;
    let donations = platform.list_available()?;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&donations)?);
        return Ok(());
    }

    println!("{}", "=== Available Donations ===".cyan().bold());
    if donations.is_empty() {
        println!("No donations available right now");
        return Ok(());
    }
    print_donations(&donations);
    Ok(())
}

fn list_mine(config: &Config, credential: &Credential) -> error::Result<()> {
    let platform = open_platform(config)?;
    let donations = platform.my_donations(credential)?;

    println!("{}", "=== Your Donations ===".cyan().bold());
    if donations.is_empty() {
        println!("You have not listed anything yet");
        return Ok(());
    }
    print_donations(&donations);
    Ok(())
}

fn claim(config: &Config, credential: &Credential, id: &str) -> error::Result<()> {
    let platform = open_platform(config)?;
    let donation = platform.claim(credential, id)?;

    println!("{}", "✓ Donation claimed!".green());
    println!("  Item:    {}", donation.item_name);
    println!("  Pickup:  {}", donation.pickup_address);
    println!("  Contact: {} ({})", donation.full_name, donation.contact_number);
    if !donation.storage_instructions.is_empty() {
        println!("  Storage: {}", donation.storage_instructions);
    }
    Ok(())
}

fn remove(config: &Config, credential: &Credential, id: &str, yes: bool) -> error::Result<()> {
    let platform = open_platform(config)?;

    if !yes && !utils::confirm_action(&format!("Withdraw donation {}?", id)) {
        println!("Cancelled");
        return Ok(());
    }

    platform.remove_donation(credential, id)?;
    println!("{}", "✓ Donation withdrawn".green());
    Ok(())
}

async fn read_files(files: &[std::path::PathBuf]) -> error::Result<Vec<Vec<u8>>> {
    let mut images = Vec::with_capacity(files.len());
    for file in files {
        let bytes = tokio::fs::read(file)
            .await
            .map_err(|e| anyhow::anyhow!("reading {}: {}", file.display(), e))?;
        images.push(bytes);
    }
    Ok(images)
}

fn print_draft(draft: &ReceiptDraft) {
    for (field, _) in receipt::RECEIPT_LABELS {
        let value = draft.get(*field);
        let shown = if value.is_empty() {
            "(not found)".dimmed().to_string()
        } else if draft.extracted.contains(field) {
            value.green().to_string()
        } else {
            value.to_string()
        };
        println!("  {:<15} {}", field.to_string(), shown);
    }
}

async fn extract(config: &Config, files: &[std::path::PathBuf]) -> error::Result<()> {
    let images = read_files(files).await?;
    let drafts = receipt::extract_many(&TextPassthrough, &images, config.ocr_timeout()).await;

    for (file, draft) in files.iter().zip(&drafts) {
        println!("{}", format!("=== {} ===", file.display()).cyan().bold());
        print_draft(draft);
        let missing = draft.missing();
        if !missing.is_empty() {
            let names: Vec<String> = missing.iter().map(ToString::to_string).collect();
            println!("  {} {}", "Fill in before submitting:".yellow(), names.join(", "));
        }
    }
    Ok(())
}

async fn submit(config: &Config, credential: &Credential, args: SubmitArgs) -> error::Result<()> {
    let platform = open_platform(config)?;

    let mut draft = match &args.text_file {
        Some(path) => {
            let images = read_files(std::slice::from_ref(path)).await?;
            receipt::extract_with_timeout(&TextPassthrough, &images[0], config.ocr_timeout()).await
        }
        None => ReceiptDraft::default(),
    };

    let corrections = [
        (ReceiptField::BillNumber, &args.bill_number),
        (ReceiptField::ItemPurchased, &args.item),
        (ReceiptField::Vendor, &args.vendor),
        (ReceiptField::TotalAmount, &args.amount),
        (ReceiptField::PurchaseDate, &args.purchase_date),
    ];
    for (field, value) in corrections {
        if let Some(value) = value {
            draft.correct(field, value);
        }
    }

    println!("{}", "Submitting receipt:".cyan());
    print_draft(&draft);

    let score = platform.submit_receipt(
        credential,
        draft,
        args.bill_type,
        args.purchase_mode,
        args.eco_certification,
    )?;

    println!("\n{}", "✓ Green score submitted!".green());
    println!("  Total: {}", utils::format_score(score.green_score));
    println!("  Badge: {}", score.badge);
    Ok(())
}

fn show_score(config: &Config, credential: &Credential, user_id: Option<String>) -> error::Result<()> {
    let platform = open_platform(config)?;
    let user_id = match user_id {
        Some(id) => id,
        None => platform.whoami(credential)?.user_id,
    };

    let score = platform.get_score(&user_id)?;
    println!("🌱 Green score: {}", utils::format_score(score.green_score));
    println!("🏅 Badge:       {}", score.badge);
    Ok(())
}

fn show_history(config: &Config, credential: &Credential) -> error::Result<()> {
    let platform = open_platform(config)?;
    let history = platform.my_history(credential)?;

    println!("{}", "=== Receipt History ===".cyan().bold());
    if history.is_empty() {
        println!("No receipts submitted yet");
        return Ok(());
    }

    utils::print_table_border(100);
    utils::print_table_row(
        &["Submitted", "Vendor", "Item", "Certification", "Points"],
        &[22, 20, 20, 14, 8],
    );
    utils::print_table_border(100);
    for record in &history {
        utils::print_table_row(
            &[
                &utils::format_timestamp(&record.submitted_at),
                &record.submission.vendor,
                &record.submission.item_purchased,
                record.submission.eco_certification.as_str(),
                &record.score_delta.to_string(),
            ],
            &[22, 20, 20, 14, 8],
        );
    }
    utils::print_table_border(100);
    Ok(())
}

fn show_leaderboard(config: &Config, top: Option<usize>, format: &str) -> error::Result<()> {
    let platform = open_platform(config)?;
    let entries = platform.leaderboard(top.unwrap_or(config.leaderboard.default_size))?;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    println!("{}", "=== 🌟 Leaderboard ===".cyan().bold());
    if entries.is_empty() {
        println!("No leaders yet");
        return Ok(());
    }

    utils::print_table_border(80);
    utils::print_table_row(&["#", "Name", "User", "Score", "Badge"], &[4, 20, 12, 10, 28]);
    utils::print_table_border(80);
    for entry in &entries {
        utils::print_table_row(
            &[
                &entry.rank.to_string(),
                &entry.name,
                &utils::format_id(&entry.user_id),
                &entry.green_score.to_string(),
                entry.badge.label(),
            ],
            &[4, 20, 12, 10, 28],
        );
    }
    utils::print_table_border(80);
    Ok(())
}

fn blog(config: &Config, credential: &Credential, action: BlogCommands) -> error::Result<()> {
    let platform = open_platform(config)?;

    match action {
        BlogCommands::Post { title, content, image_ref } => {
            let id = platform.publish_post(credential, NewPost { title, content, image_ref })?;
            println!("{}", "✓ Post published".green());
            println!("  Id: {}", id);
        }
        BlogCommands::List { format } => {
            let posts = platform.list_posts()?;
            if format == "json" {
                println!("{}", serde_json::to_string_pretty(&posts)?);
                return Ok(());
            }

            println!("{}", "=== Community Blog ===".cyan().bold());
            if posts.is_empty() {
                println!("No posts yet");
                return Ok(());
            }
            utils::print_table_border(100);
            utils::print_table_row(&["Id", "Title", "Author", "Published"], &[36, 30, 16, 10]);
            utils::print_table_border(100);
            for post in &posts {
                utils::print_table_row(
                    &[
                        &post.id,
                        &post.title,
                        &post.author_name,
                        &post.created_at.format("%Y-%m-%d").to_string(),
                    ],
                    &[36, 30, 16, 10],
                );
            }
            utils::print_table_border(100);
        }
        BlogCommands::Show { id } => {
            let details = platform.get_post(&id)?;
            let post = &details.post;

            println!("{}", post.title.cyan().bold());
            println!("By {} on {}", post.author_name, utils::format_timestamp(&post.created_at));
            if let Some(image) = &post.image_ref {
                println!("Image: {}", image);
            }
            println!("\n{}\n", post.content);

            println!("{}", "Comments:".cyan());
            if details.comments.is_empty() {
                println!("  No comments yet. Be the first to comment!");
            }
            for c in &details.comments {
                println!(
                    "  {} {} {}",
                    c.author_name.bold(),
                    c.text,
                    format!("({})", utils::format_id(&c.id)).dimmed()
                );
            }
        }
        BlogCommands::Delete { id, yes } => {
            if !yes && !utils::confirm_action(&format!("Delete post {}?", id)) {
                println!("Cancelled");
                return Ok(());
            }
            platform.delete_post(credential, &id)?;
            println!("{}", "✓ Post deleted".green());
        }
    }
    Ok(())
}

fn comment(config: &Config, credential: &Credential, action: CommentCommands) -> error::Result<()> {
    let platform = open_platform(config)?;

    match action {
        CommentCommands::Add { post_id, text } => {
            let comment = platform.add_comment(credential, &post_id, &text)?;
            println!("{}", "✓ Comment posted".green());
            println!("  Id: {}", comment.id);
        }
        CommentCommands::Delete { post_id, comment_id } => {
            platform.delete_comment(credential, &post_id, &comment_id)?;
            println!("{}", "✓ Comment deleted".green());
        }
    }
    Ok(())
}

fn show_stats(config: &Config, format: &str) -> error::Result<()> {
    let db = open_database(config)?;
    let stats = db.get_stats()?;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("{}", "=== EcoShare Statistics ===".cyan().bold());
    println!("\nUsers:        {}", stats.total_users);
    println!("\nDonations:");
    println!("  Available:  {}", stats.available_donations.to_string().green());
    println!("  Claimed:    {}", stats.claimed_donations.to_string().cyan());
    println!("  Removed:    {}", stats.removed_donations.to_string().yellow());
    println!("\nReceipts:");
    println!("  Submitted:  {}", stats.total_submissions);
    println!("  Total pts:  {}", utils::format_score(stats.total_green_score));
    println!("\nBlog posts:   {}", stats.total_posts);
    Ok(())
}
