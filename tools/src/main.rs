//! economy-runner: headless driver for the economy core.
//!
//! Usage:
//!   economy-runner --seed 12345 --cycles 48 --db run.db
//!   economy-runner --config economy.json --frame-dt 0.5
//!   economy-runner --ipc-mode

mod demo;

use anyhow::Result;
use economy_core::{
    command::EconomyCommand,
    company_subsystem::CompanySubsystem,
    config::EconomyConfig,
    context::EconomyContext,
    housing_subsystem::HousingSubsystem,
    job_subsystem::{JobBoard, JobSpec},
    persistence_subsystem::PersistenceSubsystem,
    security_subsystem::SecuritySubsystem,
    settlement::CycleReport,
    store::SqliteStore,
    types::{Cycle, Money, Morale},
};
use std::env;
use std::io::{self, BufRead, Write};

type Persistence = PersistenceSubsystem<SqliteStore>;

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    GetState,
    Advance { seconds: f64 },
    Command { command: EconomyCommand },
    StartJob { job: JobSpec },
    Quit,
}

#[derive(serde::Serialize)]
struct UiState {
    cycle:             Cycle,
    paused:            bool,
    remaining:         String,
    progress:          f64,
    currency:          Money,
    morale:            Morale,
    level:             i32,
    efficiency:        f64,
    average_idle:      f64,
    storage_percent:   f64,
    storage_warning:   bool,
    active_jobs:       usize,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let cycles = parse_arg(&args, "--cycles", 12u64);
    let frame_dt = frame_dt_arg(&args)?;
    let db = str_arg(&args, "--db").unwrap_or(":memory:");

    let mut config = match str_arg(&args, "--config") {
        Some(path) => EconomyConfig::load(path)?,
        None => EconomyConfig::default(),
    };
    config.seed = parse_arg(&args, "--seed", config.seed);
    if let Some(scale) = str_arg(&args, "--time-scale").and_then(|s| s.parse().ok()) {
        config.clock.time_scale = scale;
    }

    let session_id = format!("session-{}-{}", config.seed, chrono::Utc::now().format("%Y%m%d%H%M%S"));

    if !ipc_mode {
        println!("economy-runner");
        println!("  session:   {session_id}");
        println!("  seed:      {}", config.seed);
        println!("  cycles:    {cycles}");
        println!("  frame dt:  {frame_dt}s");
        println!("  db:        {db}");
        println!();
    }

    let store = SqliteStore::open(db)?;
    store.migrate()?;
    store.insert_session(&session_id, config.seed, env!("CARGO_PKG_VERSION"))?;

    let mut ctx = build_context(session_id.clone(), config, store)?;
    ctx.init()?;

    if let Some((jobs, pool)) = ctx.subsystem_with_pool::<JobBoard>() {
        if let Err(e) = jobs.start_job(pool, demo::starter_job(), 0) {
            log::warn!("runner: starter job refused: {e}");
        }
    }

    if ipc_mode {
        run_ipc_loop(&mut ctx)?;
    } else {
        run_headless(&mut ctx, cycles, frame_dt)?;
        print_summary(&ctx)?;
    }

    let final_state = ctx.shutdown();
    if let Some(persistence) = ctx.subsystem_mut::<Persistence>() {
        persistence.sink.insert_snapshot(&final_state)?;
    }
    Ok(())
}

fn build_context(session_id: String, config: EconomyConfig, store: SqliteStore) -> Result<EconomyContext> {
    let intrusion = config.intrusion.clone();
    let mut ctx = EconomyContext::build(session_id.clone(), config)?;

    // EXECUTION ORDER inside shared phases follows registration order.
    ctx.register(Box::new(CompanySubsystem::new(demo::DemoPortfolio::new())))?;
    ctx.register(Box::new(HousingSubsystem::new(demo::DemoHousing {
        rent: 60,
        bonus: 2,
        missed_rents: 0,
    })))?;
    ctx.register(Box::new(SecuritySubsystem::new(
        demo::DemoSecurity { plan: "firewall-pro", fee: 25, defence_rate: 0.8 },
        intrusion,
    )))?;
    ctx.register(Box::new(PersistenceSubsystem::new(session_id, store)))?;
    Ok(ctx)
}

fn run_headless(ctx: &mut EconomyContext, cycles: u64, frame_dt: f64) -> Result<()> {
    while ctx.clock().total_cycles_completed() < cycles {
        let report = ctx.advance(frame_dt)?;
        for cycle in &report.cycles {
            persist_report(ctx, cycle)?;
        }
    }
    Ok(())
}

fn run_ipc_loop(ctx: &mut EconomyContext) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }

        let cmd: IpcCommand = match serde_json::from_str(&buffer) {
            Ok(c) => c,
            Err(e) => {
                let err_json = serde_json::json!({ "error": e.to_string() });
                writeln!(stdout, "{}", err_json)?;
                stdout.flush()?;
                continue;
            }
        };

        match cmd {
            IpcCommand::Quit => break,
            IpcCommand::GetState => {}
            IpcCommand::Advance { seconds } => {
                let report = ctx.advance(seconds)?;
                for cycle in &report.cycles {
                    persist_report(ctx, cycle)?;
                }
            }
            IpcCommand::Command { command } => {
                if let Some(report) = ctx.apply_command(command)? {
                    persist_report(ctx, &report)?;
                }
            }
            IpcCommand::StartJob { job } => {
                let cycle = ctx.clock().total_cycles_completed();
                if let Some((jobs, pool)) = ctx.subsystem_with_pool::<JobBoard>() {
                    if let Err(e) = jobs.start_job(pool, job, cycle) {
                        let err_json = serde_json::json!({ "error": e.to_string() });
                        writeln!(stdout, "{}", err_json)?;
                    }
                }
            }
        }
        let state = build_ui_state(ctx);
        writeln!(stdout, "{}", serde_json::to_string(&state)?)?;
        stdout.flush()?;
    }
    Ok(())
}

fn persist_report(ctx: &EconomyContext, report: &CycleReport) -> Result<()> {
    if let Some(persistence) = ctx.subsystem::<Persistence>() {
        persistence.sink.append_report(&ctx.session_id, report)?;
    }
    Ok(())
}

fn build_ui_state(ctx: &EconomyContext) -> UiState {
    let pool = ctx.pool();
    UiState {
        cycle:           ctx.clock().total_cycles_completed(),
        paused:          ctx.clock().is_paused(),
        remaining:       ctx.clock().formatted_remaining(),
        progress:        ctx.clock().progress_fraction(),
        currency:        pool.currency(),
        morale:          pool.morale(),
        level:           pool.level(),
        efficiency:      ctx.efficiency.pool_efficiency(pool),
        average_idle:    pool.average_idle_percent(),
        storage_percent: pool.usage_percent(economy_core::resource::ResourceDimension::Storage),
        storage_warning: pool.is_storage_nearly_full(),
        active_jobs:     ctx.subsystem::<JobBoard>().map(|j| j.active().len()).unwrap_or(0),
    }
}

fn print_summary(ctx: &EconomyContext) -> Result<()> {
    let state = build_ui_state(ctx);
    println!("=== SESSION SUMMARY ===");
    println!("  session:        {}", ctx.session_id);
    println!("  cycles:         {}", state.cycle);
    println!("  next cycle in:  {}", state.remaining);
    println!("  currency:       {}", state.currency);
    println!("  morale:         {}", state.morale);
    println!("  efficiency:     {:.1}", state.efficiency);
    println!("  avg idle:       {:.1}%", state.average_idle);
    println!("  storage:        {:.1}%{}", state.storage_percent, if state.storage_warning { " (!)" } else { "" });
    println!("  active jobs:    {}", state.active_jobs);

    if let Some(persistence) = ctx.subsystem::<Persistence>() {
        let store = &persistence.sink;
        println!();
        println!("=== SETTLEMENT LOG ===");
        for event_type in [
            "salary_paid",
            "company_loss_unresolved",
            "rent_unpaid",
            "security_fee_unpaid",
            "intrusion_succeeded",
            "handler_faulted",
        ] {
            println!("  {event_type:<24} {}", store.event_count(&ctx.session_id, event_type)?);
        }
        println!("  {:<24} {}", "snapshots", store.snapshot_count(&ctx.session_id)?);
    }
    Ok(())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}

/// `--frame-dt` must be positive, or the headless loop never advances.
fn frame_dt_arg(args: &[String]) -> Result<f64> {
    let frame_dt = parse_arg(args, "--frame-dt", 1.0f64);
    if !(frame_dt.is_finite() && frame_dt > 0.0) {
        anyhow::bail!("--frame-dt must be a positive number of seconds, got {frame_dt}");
    }
    Ok(frame_dt)
}

fn str_arg<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}
