// Shop setup
// Main library entry point

pub mod context;
pub mod database;
pub mod installation;
pub mod models;
pub mod security;
pub mod utils;

use log::{error, info};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub use context::basic::BasicContext;
pub use context::sources::{LiveConfig, MemorySession, SessionStore, ShopConfig, StaticSource};
pub use context::{ConfigError, ShopContext};
pub use installation::{DatabaseInstaller, InstallError};
pub use models::connection::{ConnectionParameters, CredentialKey};
pub use models::state::ConfigRegistry;

use database::initiation::SqlScriptInitiator;
use database::provisioning::MySqlDatabaseCreator;
use database::views::SqlScriptViewRegenerator;
use installation::config_file::TomlConfigFileDao;

/// Initialize logging with dual format (human-readable + JSON sibling file).
///
/// File location and level come from the shop context, so they follow whatever source is
/// currently authoritative (fact file before install, live configuration after).
pub fn init_logging(ctx: &ShopContext, with_stdout: bool) -> Result<(), Box<dyn std::error::Error>> {
    let txt_log_file = ctx.log_file_path()?;
    let json_log_file = txt_log_file.with_extension("json");
    let level = utils::logging::level_filter_from_name(&ctx.log_level()?);

    if let Some(dir) = txt_log_file.parent() {
        std::fs::create_dir_all(dir)?;
    }

    let mut dispatch = fern::Dispatch::new().level(level);

    if with_stdout {
        dispatch = dispatch.chain(
            fern::Dispatch::new()
                .format(|out, message, record| {
                    let timestamp_local = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
                    let message_str = format!("{}", message);
                    let (phase, step, cleaned_message) =
                        utils::logging::parse_log_metadata(&message_str);
                    let txt_line = utils::logging::format_human_readable_log(
                        &timestamp_local.to_string(),
                        record.level(),
                        record.target(),
                        &cleaned_message,
                        phase.as_deref(),
                        step.as_deref(),
                    );
                    out.finish(format_args!("{}", txt_line));
                })
                .chain(std::io::stdout()),
        );
    }

    dispatch = dispatch
        .chain(
            fern::Dispatch::new()
                .format(|out, message, record| {
                    let timestamp_utc = chrono::Utc::now().to_rfc3339();
                    let message_str = format!("{}", message);
                    let (phase, step, cleaned_message) =
                        utils::logging::parse_log_metadata(&message_str);
                    let json_line = utils::logging::format_json_log(
                        &timestamp_utc,
                        record.level(),
                        record.target(),
                        &cleaned_message,
                        phase.as_deref(),
                        step.as_deref(),
                    );
                    out.finish(format_args!("{}\n", json_line));
                })
                .chain(fern::log_file(&json_log_file)?),
        )
        .chain(
            fern::Dispatch::new()
                .format(|out, message, record| {
                    let timestamp_local = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
                    let message_str = format!("{}", message);
                    let (phase, step, cleaned_message) =
                        utils::logging::parse_log_metadata(&message_str);
                    let txt_line = utils::logging::format_human_readable_log(
                        &timestamp_local.to_string(),
                        record.level(),
                        record.target(),
                        &cleaned_message,
                        phase.as_deref(),
                        step.as_deref(),
                    );
                    out.finish(format_args!("{}\n", txt_line));
                })
                .chain(fern::log_file(&txt_log_file)?),
        );

    dispatch.apply()?;

    info!(
        "[PHASE: initialization] Logging initialized (file={:?}, level={})",
        txt_log_file, level
    );
    Ok(())
}

/// Installer wired to MySQL and the TOML config file named by `basic`.
pub fn mysql_installer(basic: Arc<BasicContext>, registry: Arc<ConfigRegistry>) -> DatabaseInstaller {
    let sql_dir = basic.setup_sql_path().to_path_buf();
    DatabaseInstaller::new(
        Arc::new(MySqlDatabaseCreator),
        Arc::new(SqlScriptInitiator::new(&sql_dir)),
        Arc::new(TomlConfigFileDao::new(basic.config_file_path())),
        Arc::new(SqlScriptViewRegenerator::new(Arc::clone(&registry), &sql_dir)),
        basic,
        registry,
    )
}

fn bootstrap(settings_file: Option<&Path>) -> Result<(Arc<BasicContext>, ShopContext), String> {
    let basic = Arc::new(
        BasicContext::load(settings_file).map_err(|e| format!("Failed to load settings: {:#}", e))?,
    );
    let registry = Arc::new(ConfigRegistry::new());
    let ctx = ShopContext::new(Arc::clone(&basic), registry, Arc::new(MemorySession::new()));
    Ok((basic, ctx))
}

/// Run a full install. Returns the process exit code.
pub fn run_install(settings_file: Option<PathBuf>, params: ConnectionParameters) -> i32 {
    let (basic, ctx) = match bootstrap(settings_file.as_deref()) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("{}", e);
            return 2;
        }
    };

    if let Err(e) = init_logging(&ctx, true) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    info!(
        "[PHASE: initialization] Shop setup starting at {} (root={:?})",
        chrono::Utc::now(),
        basic.shop_root_path()
    );

    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            error!("[PHASE: initialization] [STEP: runtime] Failed to start runtime: {:?}", e);
            eprintln!("Failed to start runtime: {}", e);
            return 1;
        }
    };

    let installer = mysql_installer(basic, Arc::clone(ctx.registry()));
    match rt.block_on(installer.install(&params)) {
        Ok(()) => {
            println!("Database '{}' installed.", params.database_name);
            0
        }
        Err(e) => {
            eprintln!("Install failed at {}: {}", e.step(), installation::error_chain(&e));
            1
        }
    }
}

/// Print the bootstrap configuration as the shop context resolves it. Returns the process exit code.
pub fn run_context(settings_file: Option<PathBuf>) -> i32 {
    let (basic, ctx) = match bootstrap(settings_file.as_deref()) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("{}", e);
            return 2;
        }
    };

    let show = |r: Result<String, ConfigError>| r.unwrap_or_else(|e| format!("<error: {}>", e));

    println!("shop root        : {}", basic.shop_root_path().display());
    println!("config file      : {}", basic.config_file_path().display());
    println!("setup sql        : {}", basic.setup_sql_path().display());
    println!("config loaded    : {}", ctx.is_config_loaded());
    println!("log level        : {}", show(ctx.log_level()));
    println!(
        "log file         : {}",
        show(ctx.log_file_path().map(|p| p.display().to_string()))
    );
    println!("admin            : {}", show(ctx.is_admin().map(|b| b.to_string())));
    println!("admin query log  : {}", ctx.is_admin_query_log_enabled());
    println!("admin log file   : {}", ctx.admin_log_file_path().display());
    println!(
        "contact fields   : {}",
        show(ctx.required_contact_form_fields().map(|f| f.join(", ")))
    );
    0
}
