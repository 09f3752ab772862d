// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{bail, Context, Result};
use rand::Rng;
use std::env;
use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{info, warn};

// Use library instead of local modules
use parish_ledger::config::init_tracing;
use parish_ledger::{
    write_contributions_csv, AuthSlice, CommandSpooler, Config, ContributionOwner, Delivered, MockApi,
    ParentRef, ReceiptOutput, ReceiptPayload, ReceiptWriter, SessionStore, Store, User,
};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing()?;
    let config = Config::load()?;
    let args: Vec<String> = env::args().collect();

    match args.get(1).map(String::as_str) {
        Some("receipt") => run_receipt(&config, &args[2..]).await?,
        Some("export") => run_export(&config, &args[2..]).await?,
        Some("login") => run_login(&config, &args[2..])?,
        Some("logout") => run_logout(&config)?,
        Some("whoami") => run_whoami(&config)?,
        // UI mode (default)
        _ => run_ui_mode(&config).await?,
    }

    Ok(())
}

/// Warm every cache slice the dashboard shows
///
/// Top-level lists load concurrently, then communities, families and
/// contributions fan out per parent. Failures are logged and leave the
/// slot in its rejected state.
#[cfg_attr(not(feature = "tui"), allow(dead_code))]
pub async fn load_dashboard(store: &Arc<Store>) {
    let (foranes, parishes, individuals, institutions) = tokio::join!(
        store.fetch_foranes(),
        store.fetch_parishes(),
        store.fetch_individuals(),
        store.fetch_institutions(),
    );
    for rejection in [foranes.err(), parishes.err(), individuals.err(), institutions.err()]
        .into_iter()
        .flatten()
    {
        warn!(%rejection, "dashboard load failed");
    }

    // Communities hang off both foranes and parishes
    let parents: Vec<ParentRef> = store.select(|s| {
        s.foranes
            .items
            .iter()
            .map(|f| ParentRef::forane(f.id))
            .chain(s.parishes.items.iter().map(|p| ParentRef::parish(p.id)))
            .collect()
    });
    let mut tasks = JoinSet::new();
    for parent in parents {
        let store = Arc::clone(store);
        tasks.spawn(async move { store.fetch_communities(parent).await.map(|_| ()) });
    }
    drain(&mut tasks).await;

    let community_ids: Vec<u64> = store.select(|s| s.communities.items().map(|c| c.id).collect());
    for community_id in community_ids {
        let store = Arc::clone(store);
        tasks.spawn(async move { store.fetch_families(community_id).await.map(|_| ()) });
    }
    drain(&mut tasks).await;

    let owners: Vec<ContributionOwner> = store.select(|s| {
        s.families
            .items()
            .map(|f| ContributionOwner::Family(f.id))
            .chain(s.individuals.items.iter().map(|i| ContributionOwner::Individual(i.id)))
            .chain(s.institutions.items.iter().map(|i| ContributionOwner::Institution(i.id)))
            .collect()
    });
    for owner in owners {
        let store = Arc::clone(store);
        tasks.spawn(async move { store.fetch_contributions(owner).await.map(|_| ()) });
    }
    drain(&mut tasks).await;
}

async fn drain(tasks: &mut JoinSet<parish_ledger::ThunkResult<()>>) {
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(rejection)) => warn!(%rejection, "dashboard load failed"),
            Err(e) => warn!("dashboard task aborted: {}", e),
        }
    }
}

async fn run_receipt(config: &Config, args: &[String]) -> Result<()> {
    let Some(id) = args.first() else {
        bail!("usage: parish-ledger receipt <contribution-id> [--print] [path]");
    };
    let id: u64 = id.parse().with_context(|| format!("invalid contribution id: {}", id))?;
    let print = args.iter().any(|a| a == "--print");
    let path = args.iter().skip(1).find(|a| *a != "--print").map(PathBuf::from);

    println!("🧾 Contribution Receipt");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let api = MockApi::from_config(&config.api);
    let contribution = api.get_contribution(id).await?;
    let contributor = api.contributor_name(contribution.owner).await?;
    println!("✓ Contribution #{} from {} ({})", contribution.id, contributor, contribution.display_amount());

    let payload = ReceiptPayload::for_contribution(&contribution, &contributor, "Parish Office");
    let writer = ReceiptWriter::new(CommandSpooler::new("lp"), &config.receipt.output_dir);
    let output = if print {
        ReceiptOutput::Print
    } else {
        ReceiptOutput::Save(path.unwrap_or_else(|| config.receipt.output_dir.join(payload.file_name())))
    };

    match writer.deliver(&payload, output)? {
        Delivered::Saved(path) => println!("✅ Saved receipt {} to {}", payload.receipt_number(), path.display()),
        Delivered::Printed => println!("🖨️  Receipt {} sent to printer", payload.receipt_number()),
        Delivered::SavedFallback(path) => {
            println!("⚠️  Printing unavailable");
            println!("✅ Saved receipt {} to {}", payload.receipt_number(), path.display());
        }
    }

    Ok(())
}

async fn run_export(config: &Config, args: &[String]) -> Result<()> {
    let (Some(kind), Some(id)) = (args.first(), args.get(1)) else {
        bail!("usage: parish-ledger export <family|individual|institution> <id> [path]");
    };
    let id: u64 = id.parse().with_context(|| format!("invalid id: {}", id))?;
    let owner = ContributionOwner::parse(kind, id)?;

    println!("📤 Exporting contributions of {}", owner);

    let store = Store::new(Arc::new(MockApi::from_config(&config.api)));
    let contributions = store.fetch_contributions(owner).await?;

    let count = match args.get(2) {
        Some(path) => {
            let file = File::create(path).with_context(|| format!("cannot create {}", path))?;
            let count = write_contributions_csv(file, &contributions)?;
            println!("✅ Wrote {} contributions to {}", count, path);
            count
        }
        None => write_contributions_csv(std::io::stdout(), &contributions)?,
    };
    info!(%owner, count, "export complete");

    Ok(())
}

fn open_auth(config: &Config) -> Result<AuthSlice> {
    let session = SessionStore::open(&config.session.path)?;
    Ok(AuthSlice::restore(session)?)
}

fn run_login(config: &Config, args: &[String]) -> Result<()> {
    let (Some(name), Some(email)) = (args.first(), args.get(1)) else {
        bail!("usage: parish-ledger login <name> <email>");
    };

    let mut auth = open_auth(config)?;
    let mut rng = rand::thread_rng();
    let user = User {
        id: 1,
        name: name.clone(),
        email: email.clone(),
        role: "admin".to_string(),
    };
    auth.sign_in(user, format!("{:016x}", rng.gen::<u64>()), format!("{:016x}", rng.gen::<u64>()))?;

    println!("🔐 Signed in as {} <{}>", name, email);
    Ok(())
}

fn run_logout(config: &Config) -> Result<()> {
    let mut auth = open_auth(config)?;
    auth.sign_out()?;
    println!("👋 Signed out");
    Ok(())
}

fn run_whoami(config: &Config) -> Result<()> {
    let auth = open_auth(config)?;
    match &auth.state().user {
        Some(user) if auth.state().is_authenticated => {
            println!("👤 {} <{}> ({})", user.name, user.email, user.role)
        }
        _ => println!("❌ Not signed in"),
    }
    Ok(())
}

#[cfg(feature = "tui")]
async fn run_ui_mode(config: &Config) -> Result<()> {
    println!("🖥️  Loading Parish Ledger...\n");

    let store = Arc::new(Store::new(Arc::new(MockApi::from_config(&config.api))));

    println!("📊 Loading foranes, parishes and contributors...");
    load_dashboard(&store).await;
    let ledger = store.snapshot();

    println!(
        "✓ Loaded {} foranes, {} parishes, {} families\n",
        ledger.foranes.items.len(),
        ledger.parishes.items.len(),
        ledger.families.items().count()
    );
    println!("Starting UI... (Press 'q' to quit)\n");

    // Create and run app
    let mut app = ui::App::new(ledger);
    ui::run_ui(&mut app)?;

    println!("\n✅ UI closed successfully");

    Ok(())
}

#[cfg(not(feature = "tui"))]
async fn run_ui_mode(_config: &Config) -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or use the REST API: cargo run --bin ledger-server --features server");
    std::process::exit(1);
}
