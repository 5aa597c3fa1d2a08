use std::process::ExitCode;

use chrono::Utc;
use clap::{Parser, Subcommand};

use stickerdrop::error::CoreResult;
use stickerdrop::services::{
    format_count, image_url, plan_offers, prompt_access, resolve_identifier, subscribe_action,
    Identifier, OfferBadge, ProfileKey, PromptAccess, Session, SubscribeAction,
};
use stickerdrop::utils::error_handling::create_runtime;
use stickerdrop::{BackendConfig, Plan, Sticker, Storefront, APP_NAME, APP_VERSION};

#[derive(Parser)]
#[command(name = "stickerdrop")]
#[command(about = "StickerDrop storefront - daily AI stickers, likes and plans")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show today's featured sticker
    Today,

    /// List the archive, newest first
    Archive,

    /// Show one sticker; premium prompts unlock for Pro viewers
    Show {
        id: String,
        #[arg(long)]
        email: Option<String>,
    },

    /// Toggle this device's like on a sticker
    Like { id: u64 },

    /// Show the plan for an account (creates a free record on first use)
    Plan { email: String },

    /// Change the plan for an account
    SetPlan {
        email: String,
        #[arg(value_parser = parse_plan)]
        plan: Plan,
    },

    /// Show pricing offers for a viewer
    Pricing {
        #[arg(long)]
        email: Option<String>,
    },

    /// Resolve what subscribing to a plan does for a viewer
    Subscribe {
        #[arg(value_parser = parse_plan)]
        plan: Plan,
        #[arg(long)]
        email: Option<String>,
        /// Open the checkout / contact link in the browser
        #[arg(long)]
        open: bool,
    },

    /// Show a profile
    Profile { email: String },
}

fn parse_plan(raw: &str) -> Result<Plan, String> {
    raw.parse::<Plan>().map_err(|e| e.to_string())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set RUST_LOG=debug for verbose output, RUST_LOG=info for normal logs
    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .filter_module("hyper_util", log::LevelFilter::Warn)
        .filter_module("rustls", log::LevelFilter::Warn)
        .init();

    log::info!("[Main] Starting {} v{}", APP_NAME, APP_VERSION);

    let rt = match create_runtime() {
        Ok(rt) => rt,
        Err(e) => {
            log::error!("[Main] {}", e);
            return ExitCode::FAILURE;
        }
    };

    match rt.block_on(run(cli.command)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("[Main] {}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Commands) -> CoreResult<()> {
    let storefront = Storefront::connect(BackendConfig::from_env()?)?;

    match command {
        Commands::Today => match storefront.catalog.today_sticker(Utc::now().date_naive()).await {
            Some(sticker) => print_sticker(&storefront, &sticker, Plan::Free),
            None => println!("No sticker published yet."),
        },

        Commands::Archive => {
            let stickers = storefront.catalog.archive().await;
            if stickers.is_empty() {
                println!("The archive is empty.");
            }
            for sticker in stickers {
                println!(
                    "#{:<5} {}  {:<32} {:>6} likes{}",
                    sticker.id,
                    sticker.publish_date,
                    sticker.title,
                    format_count(sticker.likes),
                    if sticker.is_premium { "  [premium]" } else { "" }
                );
            }
        }

        Commands::Show { id, email } => match storefront.catalog.sticker_by_id(&id).await {
            Some(sticker) => {
                let plan = match email {
                    Some(email) => {
                        let identifier = resolve_identifier(&Session::with_email(&email))?;
                        storefront.subscriptions.resolve_plan(&identifier).await
                    }
                    None => Plan::Free,
                };
                print_sticker(&storefront, &sticker, plan);
            }
            None => println!("Sticker {} not found.", id),
        },

        Commands::Like { id } => {
            let sticker = storefront
                .catalog
                .sticker_by_id(&id.to_string())
                .await
                .ok_or_else(|| stickerdrop::CoreError::NotFound(format!("sticker {}", id)))?;

            let current = storefront.likes.load_state(sticker.id, sticker.likes);
            match storefront.likes.toggle_like(&current).await {
                Ok(settled) => println!(
                    "{} \"{}\" - {} likes",
                    if settled.liked_by_viewer { "Liked" } else { "Unliked" },
                    sticker.title,
                    format_count(settled.count)
                ),
                Err(e) => println!(
                    "Could not update like ({}); still {} likes",
                    e,
                    format_count(current.count)
                ),
            }
        }

        Commands::Plan { email } => {
            let identifier = Identifier::email(&email)?;
            let plan = storefront.subscriptions.resolve_plan(&identifier).await;
            println!("{} is on the {} plan", identifier, plan.display_name());
        }

        Commands::SetPlan { email, plan } => {
            let identifier = Identifier::email(&email)?;
            storefront.subscriptions.update_plan(&identifier, plan).await?;
            println!("{} is now on the {} plan", identifier, plan.display_name());
        }

        Commands::Pricing { email } => {
            let (plan, authenticated) = viewer_plan(&storefront, email.as_deref()).await?;
            for offer in plan_offers(plan, authenticated) {
                let label = match offer.badge {
                    OfferBadge::Current => "Current Plan",
                    OfferBadge::Included => "Included in Your Plan",
                    OfferBadge::Available => "Subscribe",
                };
                println!(
                    "{:<8} {:>4}/{:<8} {:<48} [{}]{}",
                    offer.details.plan.display_name(),
                    offer.details.price,
                    offer.details.period,
                    offer.details.description,
                    label,
                    if offer.details.popular { " *popular*" } else { "" }
                );
            }
        }

        Commands::Subscribe { plan, email, open } => {
            let (user_plan, authenticated) = viewer_plan(&storefront, email.as_deref()).await?;
            let action = subscribe_action(user_plan, plan, authenticated, &storefront.config)?;
            match &action {
                SubscribeAction::AlreadyIncluded => {
                    println!("{} is already included in your plan.", plan.display_name())
                }
                SubscribeAction::SignInRequired { callback } => {
                    println!("Sign in first (callbackUrl={}).", callback)
                }
                SubscribeAction::ActivateFree => println!("The Free plan is active for everyone."),
                SubscribeAction::Checkout(link) | SubscribeAction::ContactSales(link) => {
                    println!("{}", link);
                    if open {
                        if let Err(e) = webbrowser::open(link) {
                            log::warn!("[Main] Failed to open browser: {}", e);
                        }
                    }
                }
            }
        }

        Commands::Profile { email } => match storefront.profiles.get_profile(ProfileKey::Email(&email)).await {
            Some(profile) => {
                println!("{}", profile.display_name.as_deref().unwrap_or("(no name)"));
                if let Some(title) = &profile.title {
                    println!("  {}", title);
                }
                if let Some(bio) = &profile.bio {
                    println!("  {}", bio);
                }
                for link in &profile.social_links {
                    println!("  - {}", link);
                }
                if let Some(since) = &profile.member_since {
                    println!("  member since {}", since);
                }
            }
            None => println!("No profile saved for {}.", email),
        },
    }

    Ok(())
}

async fn viewer_plan(storefront: &Storefront, email: Option<&str>) -> CoreResult<(Plan, bool)> {
    match email {
        Some(email) => {
            let identifier = Identifier::email(email)?;
            Ok((storefront.subscriptions.resolve_plan(&identifier).await, true))
        }
        None => Ok((Plan::Free, false)),
    }
}

fn print_sticker(storefront: &Storefront, sticker: &Sticker, plan: Plan) {
    let liked = storefront.likes.load_state(sticker.id, sticker.likes);
    println!("#{} {} ({})", sticker.id, sticker.title, sticker.publish_date);
    println!("  image: {}", image_url(&storefront.config.url, &sticker.image_url));
    println!(
        "  {} {} likes",
        if liked.liked_by_viewer { "♥" } else { "♡" },
        format_count(liked.count)
    );
    match prompt_access(sticker, plan) {
        PromptAccess::Visible(prompt) => println!("  prompt: {}", prompt),
        PromptAccess::Locked => {
            println!("  prompt: [premium] subscribe to any paid plan to unlock")
        }
    }
    if let Some(remix) = &sticker.remix_idea {
        println!("  remix idea: {}", remix);
    }
}
