//! partix 命令行工具
//!
//! 检查配置文件，查看与初始化 Realm 身份存储

mod cli;
mod error;
mod observability;

use clap::Parser;
use observability::init_observability;
use partix_common::{AttributedType, PartixConfig};
use partix_idm::{IdmError, PartitionManager, scenario};
use std::path::{Path, PathBuf};

use tracing::{error, info};

macro_rules! bootstrap_info {
    ($($arg:tt)*) => {
        eprintln!($($arg)*);
    };
}

macro_rules! bootstrap_error {
    ($($arg:tt)*) => {
        eprintln!($($arg)*);
    };
}

use cli::{Cli, Commands, DEFAULT_CONFIG_FILE};
use error::{Error, Result};

/// Application launcher utilities
struct ApplicationLauncher;

fn main() -> Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Test { config_file } => {
            let config_path =
                ApplicationLauncher::find_config_file(config_file.as_ref().unwrap_or(&cli.config))?;
            ApplicationLauncher::test_config_file(&config_path)
        }
        command => {
            let config_path = ApplicationLauncher::find_config_file(&cli.config)?;
            let config = ApplicationLauncher::load_config(&config_path)?;
            let observability_guard = init_observability(&config)?;
            if observability_guard.is_file_backed() {
                bootstrap_info!("Logs are written to {}", config.log_config().path);
            }

            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?;

            runtime.block_on(ApplicationLauncher::run_command(config, command))
        }
    }
}

impl ApplicationLauncher {
    /// Find config file with fallback locations
    fn find_config_file(provided_path: &PathBuf) -> Result<PathBuf> {
        if provided_path != Path::new(DEFAULT_CONFIG_FILE) {
            if provided_path.exists() {
                bootstrap_info!("Using provided config file: {:?}", provided_path);
                return Ok(provided_path.clone());
            } else {
                bootstrap_error!("Provided config file not found: {:?}", provided_path);
                return Err(Error::custom(format!(
                    "Config file not found: {provided_path:?}"
                )));
            }
        }

        let fallback_paths = vec![
            // 1. Current working directory
            PathBuf::from(DEFAULT_CONFIG_FILE),
            // 2. System config directory
            PathBuf::from("/etc/partix/partix.toml"),
        ];

        for path in &fallback_paths {
            if path.exists() {
                bootstrap_info!("Found config file: {:?}", path);
                return Ok(path.clone());
            }
        }

        bootstrap_error!("No configuration file found!");
        bootstrap_error!("Please create a config file in one of these locations:");
        for (i, path) in fallback_paths.iter().enumerate() {
            bootstrap_error!("  {}. {:?}", i + 1, path);
        }
        bootstrap_error!("Or specify a custom path with: partix --config <path>");

        Err(Error::custom(
            "No configuration file found. Please create one or specify path with --config",
        ))
    }

    /// 测试配置文件是否有效
    fn test_config_file(config_path: &Path) -> Result<()> {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_writer(std::io::stderr)
            .init();

        match PartixConfig::from_file(config_path) {
            Ok(config) => {
                info!("✅ 配置文件解析成功: {:?}", config_path);

                match config.validate() {
                    Ok(()) => {
                        info!("✅ 配置验证通过");
                    }
                    Err(errors) => {
                        error!("❌ 配置验证发现问题:");
                        for (i, err) in errors.iter().enumerate() {
                            if err.starts_with("Warning:") {
                                info!("  {}. ⚠️  {}", i + 1, err);
                            } else {
                                error!("  {}. ❌ {}", i + 1, err);
                            }
                        }
                        let has_errors = errors.iter().any(|e| !e.starts_with("Warning:"));
                        if has_errors {
                            return Err(Error::service_validation("配置验证失败"));
                        }
                    }
                }

                info!(
                    working_directory = %config.store.working_directory.display(),
                    features = %config.store.supported_features,
                    "✅ 完整配置验证通过"
                );
                Ok(())
            }
            Err(e) => {
                error!("❌ 配置文件解析失败: {}", e);
                Err(Error::service_validation(format!("配置解析失败: {e}")))
            }
        }
    }

    /// 加载并校验配置，警告只打印不阻断
    fn load_config(config_path: &Path) -> Result<PartixConfig> {
        let config = match PartixConfig::from_file(config_path) {
            Ok(config) => config,
            Err(e) => {
                bootstrap_error!("❌ 配置加载失败: {}", e);
                return Err(Error::custom(format!("配置加载失败: {e}")));
            }
        };

        if let Err(errors) = config.validate() {
            let mut has_critical_errors = false;
            for (i, err) in errors.iter().enumerate() {
                if err.starts_with("Warning:") {
                    bootstrap_info!("  {}. ⚠️  {}", i + 1, err);
                } else {
                    bootstrap_error!("  {}. ❌ {}", i + 1, err);
                    has_critical_errors = true;
                }
            }
            if has_critical_errors {
                return Err(Error::service_validation("配置验证失败，请修复上述错误"));
            }
        }

        Ok(config)
    }

    async fn run_command(config: PartixConfig, command: &Commands) -> Result<()> {
        info!(name = %config.name, "partix 启动");
        let manager = PartitionManager::new(config.store).await?;

        match command {
            Commands::Realms => {
                for realm in manager.realms().await {
                    let mut line = realm.name().to_string();
                    for (name, value) in realm.attributes().iter() {
                        line.push_str(&format!(" {name}={value}"));
                    }
                    println!("{line}");
                }
                Ok(())
            }
            Commands::Dump { realm } => match manager.describe(realm).await {
                Some(text) => {
                    print!("{text}");
                    Ok(())
                }
                None => {
                    error!(realm = %realm, "Realm 不存在");
                    Err(IdmError::RealmNotFound(realm.clone()).into())
                }
            },
            Commands::Seed => match scenario::seed_reference_realm(&manager).await {
                Ok(realm) => {
                    println!("Seeded realm {}", realm.name());
                    Ok(())
                }
                Err(IdmError::DuplicateRealm(name)) => {
                    bootstrap_error!("Realm {name} already exists, nothing seeded");
                    Err(IdmError::DuplicateRealm(name).into())
                }
                Err(e) => Err(e.into()),
            },
            Commands::Test { .. } => Ok(()),
        }
    }
}
