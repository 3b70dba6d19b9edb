#![deny(warnings)]

//! Headless host for the Dropli pet: inspect and care for the saved pet, run
//! a live session, soak-test the rules and manage archived save slots.

mod config;
mod soak;

use anyhow::{bail, Context, Result};
use config::Config;
use pet_core::{GameState, UpgradeKind};
use pet_econ::{upgrade_cost, ACCESSORIES};
use pet_runtime::{spawn_session, CareAction, PurchaseOutcome, StateStore, SystemClock};
use persistence::{archive, decode_snapshot, JsonFileStore, PersistenceGateway};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: dropli [--config FILE] [--save FILE] <command>

commands:
  status                  show the pet
  click [N]               tap the pet N times
  care <action>           nourish | rain | sleep | win
  shop                    list prices
  buy-upgrade <kind>      clickPower | autoGather | resilience
  buy-accessory <id>      buy a catalog accessory
  equip <id>              wear or remove an owned accessory
  rename <name>           change the pet's name
  run [--seconds N]       run the live clock
  soak [--steps N] [--seed S]
  backup [slot] [--note TEXT]
  restore [slot]
  slots";

#[derive(Debug, Default)]
struct Args {
    config: Option<PathBuf>,
    save: Option<PathBuf>,
    seconds: Option<u64>,
    steps: Option<u64>,
    seed: Option<u64>,
    note: Option<String>,
    command: Vec<String>,
}

fn parse_args() -> Args {
    let mut args = Args::default();
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--config" => args.config = it.next().map(PathBuf::from),
            "--save" => args.save = it.next().map(PathBuf::from),
            "--seconds" => args.seconds = it.next().and_then(|s| s.parse().ok()),
            "--steps" => args.steps = it.next().and_then(|s| s.parse().ok()),
            "--seed" => args.seed = it.next().and_then(|s| s.parse().ok()),
            "--note" => args.note = it.next(),
            _ => args.command.push(arg),
        }
    }
    args
}

type Store = StateStore<JsonFileStore, SystemClock>;

fn open_store(cfg: &Config) -> Store {
    StateStore::open_with_name(JsonFileStore::new(&cfg.save_path), SystemClock, &cfg.pet_name)
}

fn print_status(s: &GameState) {
    println!(
        "{} | lvl {} (stage {}) | xp {:.1}/{:.1} | dewdrops {:.0}{}",
        s.name,
        s.level,
        s.evolution,
        s.xp,
        pet_core::xp_to_next(s.level),
        s.dewdrops,
        if s.is_sleeping { " | asleep" } else { "" }
    );
    println!(
        "minerals {} | hydration {} | happiness {} | sleep {}",
        s.minerals, s.hydration, s.happiness, s.sleep
    );
    let worn: Vec<String> = s
        .equipped
        .iter()
        .map(|(slot, id)| format!("{slot}={id}"))
        .collect();
    if !worn.is_empty() {
        println!("wearing {}", worn.join(", "));
    }
}

fn print_shop(s: &GameState) {
    for kind in UpgradeKind::ALL {
        let owned = s.upgrades.level(kind);
        println!("{kind:<12} lvl {owned:<3} next {:.0}", upgrade_cost(kind, owned));
    }
    for a in ACCESSORIES.iter() {
        let tag = if s.owns(a.id) {
            "owned".to_string()
        } else if s.level < a.unlock_level {
            format!("locked until lvl {}", a.unlock_level)
        } else {
            format!("{:.0}", a.cost)
        };
        println!("{:<12} {:<5} {tag}", a.id, a.slot);
    }
}

fn report_purchase(what: &str, outcome: PurchaseOutcome) {
    match outcome {
        PurchaseOutcome::Purchased => println!("bought {what}"),
        PurchaseOutcome::InsufficientFunds => println!("not enough dewdrops for {what}"),
        PurchaseOutcome::AlreadyOwned => println!("{what} is already owned"),
        PurchaseOutcome::Rejected => println!("{what} has an invalid price"),
    }
}

fn arg<'a>(args: &'a Args, i: usize, what: &str) -> Result<&'a str> {
    match args.command.get(i) {
        Some(a) => Ok(a.as_str()),
        None => bail!("missing {what}\n\n{USAGE}"),
    }
}

async fn run_live(cfg: &Config, seconds: u64) -> Result<()> {
    let store = open_store(cfg);
    let session = spawn_session(store);
    let mut updates = session.subscribe();
    let deadline = tokio::time::sleep(Duration::from_secs(seconds));
    tokio::pin!(deadline);
    info!(seconds, "live session running");
    loop {
        tokio::select! {
            _ = &mut deadline => break,
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let s = updates.borrow_and_update().clone();
                print_status(&s);
            }
        }
    }
    let store = session.stop().await.context("session task failed")?;
    print_status(store.snapshot());
    Ok(())
}

async fn backup(cfg: &Config, slot: &str, note: Option<&str>) -> Result<()> {
    let gateway = JsonFileStore::new(&cfg.save_path);
    let Some(payload) = gateway.read()? else {
        bail!("no save at {}", cfg.save_path.display());
    };
    archive::ensure_parent_dir(&cfg.archive_url)?;
    let pool = archive::init_db(&cfg.archive_url).await?;
    archive::write_slot(&pool, slot, &payload, note).await?;
    println!("saved {} to slot {slot}", cfg.save_path.display());
    Ok(())
}

async fn restore(cfg: &Config, slot: &str) -> Result<()> {
    archive::ensure_parent_dir(&cfg.archive_url)?;
    let pool = archive::init_db(&cfg.archive_url).await?;
    let Some(payload) = archive::read_slot(&pool, slot).await? else {
        bail!("slot {slot} is empty");
    };
    let now = chrono::Utc::now().timestamp_millis();
    decode_snapshot(&payload, now).with_context(|| format!("slot {slot} is not a valid save"))?;
    let mut gateway = JsonFileStore::new(&cfg.save_path);
    gateway.write(&payload)?;
    println!("restored slot {slot}");
    print_status(open_store(cfg).snapshot());
    Ok(())
}

async fn list_slots(cfg: &Config) -> Result<()> {
    archive::ensure_parent_dir(&cfg.archive_url)?;
    let pool = archive::init_db(&cfg.archive_url).await?;
    for s in archive::list_slots(&pool).await? {
        let when = chrono::DateTime::<chrono::Utc>::from_timestamp_millis(s.saved_at)
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| s.saved_at.to_string());
        println!("{:<16} {when} {}", s.slot, s.note.unwrap_or_default());
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = parse_args();
    let mut cfg = Config::load(args.config.as_deref())?;
    if let Some(save) = &args.save {
        cfg.save_path = save.clone();
    }

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cfg.log_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();
    info!(command = ?args.command, save = %cfg.save_path.display(), "starting CLI");

    let command = args.command.first().map(String::as_str).unwrap_or("status");
    match command {
        "status" => print_status(open_store(&cfg).snapshot()),
        "click" => {
            let n: u32 = match args.command.get(1) {
                Some(n) => n.parse().context("click count")?,
                None => 1,
            };
            let mut store = open_store(&cfg);
            for _ in 0..n {
                store.click();
            }
            print_status(store.snapshot());
        }
        "care" => {
            let action: CareAction = arg(&args, 1, "care action")?
                .parse()
                .map_err(anyhow::Error::msg)?;
            let mut store = open_store(&cfg);
            store.perform(action);
            print_status(store.snapshot());
        }
        "shop" => print_shop(open_store(&cfg).snapshot()),
        "buy-upgrade" => {
            let kind: UpgradeKind = arg(&args, 1, "upgrade kind")?.parse()?;
            let mut store = open_store(&cfg);
            report_purchase(kind.as_str(), store.buy_listed_upgrade(kind));
        }
        "buy-accessory" => {
            let id = arg(&args, 1, "accessory id")?;
            let mut store = open_store(&cfg);
            report_purchase(id, store.buy_listed_accessory(id)?);
        }
        "equip" => {
            let id = arg(&args, 1, "accessory id")?;
            let mut store = open_store(&cfg);
            let slot = store.equip_owned(id)?;
            match store.snapshot().equipped.get(slot) {
                Some(worn) => println!("{worn} on {slot}"),
                None => println!("{slot} is empty"),
            }
        }
        "rename" => {
            let name = args.command[1..].join(" ");
            let mut store = open_store(&cfg);
            if !store.rename(&name) {
                bail!("name must not be blank");
            }
            print_status(store.snapshot());
        }
        "run" => run_live(&cfg, args.seconds.unwrap_or(10)).await?,
        "soak" => {
            let report = soak::soak(args.steps.unwrap_or(10_000), args.seed.unwrap_or(42))?;
            println!(
                "Soak OK | steps: {} | reopens: {}",
                report.steps, report.reopens
            );
            print_status(&report.state);
        }
        "backup" => {
            let slot = args.command.get(1).map(String::as_str).unwrap_or("default");
            backup(&cfg, slot, args.note.as_deref()).await?;
        }
        "restore" => {
            let slot = args.command.get(1).map(String::as_str).unwrap_or("default");
            restore(&cfg, slot).await?;
        }
        "slots" => list_slots(&cfg).await?,
        "help" | "--help" | "-h" => println!("{USAGE}"),
        other => bail!("unknown command: {other}\n\n{USAGE}"),
    }
    Ok(())
}
