//! `thr config`: profile wizard, display and edits of the config file.

use clap::ValueEnum;
use dialoguer::{Input, Select};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts, ProfileKey};
use crate::config::{self, Config, Profile};
use crate::error::CliError;
use crate::output;

const MASK: &str = "****";

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Init => init(),
        ConfigCommand::Show => show(global),
        ConfigCommand::Set { key, value } => set(global, key, value),
        ConfigCommand::Profiles => {
            list_profiles();
            Ok(())
        }
        ConfigCommand::Use { name } => use_profile(name),
        ConfigCommand::SetKey { profile } => set_key(global, profile),
    }
}

fn show(global: &GlobalOpts) -> Result<(), CliError> {
    let cfg = masked(config::load_config_or_default());
    let toml = toml::to_string_pretty(&cfg)
        .map_err(|e| CliError::Internal(format!("cannot render config: {e}")))?;
    let out = output::render_single(
        &global.output,
        &cfg,
        |_| toml.trim_end().to_owned(),
        |c| c.default_profile.clone().unwrap_or_default(),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}

/// Plaintext keys replaced by a mask; everything else untouched.
fn masked(mut cfg: Config) -> Config {
    for key in cfg.profiles.values_mut().filter_map(|p| p.api_key.as_mut()) {
        MASK.clone_into(key);
    }
    cfg
}

fn set(global: &GlobalOpts, key: ProfileKey, value: String) -> Result<(), CliError> {
    let mut cfg = config::load_config_or_default();
    let name = config::active_profile_name(global, &cfg);
    apply(cfg.profiles.entry(name.clone()).or_default(), key, value)?;
    config::save_config(&cfg)?;
    eprintln!("✓ {} updated on profile '{name}'", key_name(key));
    Ok(())
}

fn key_name(key: ProfileKey) -> String {
    key.to_possible_value()
        .map_or_else(|| format!("{key:?}"), |v| v.get_name().to_owned())
}

fn apply(profile: &mut Profile, key: ProfileKey, value: String) -> Result<(), CliError> {
    let invalid = |reason: &str| CliError::Validation {
        field: key_name(key),
        reason: reason.into(),
    };
    match key {
        ProfileKey::Url => {
            thr_config::parse_url(&value)?;
            profile.url = value;
        }
        ProfileKey::ApiKey => profile.api_key = Some(value),
        ProfileKey::ApiKeyEnv => profile.api_key_env = Some(value),
        ProfileKey::CaCert => profile.ca_cert = Some(value.into()),
        ProfileKey::Insecure => {
            profile.insecure = Some(value.parse().map_err(|_| invalid("expected true or false"))?);
        }
        ProfileKey::Timeout => {
            profile.timeout = Some(value.parse().map_err(|_| invalid("expected whole seconds"))?);
        }
    }
    Ok(())
}

fn list_profiles() {
    let cfg = config::load_config_or_default();
    if cfg.profiles.is_empty() {
        eprintln!("No profiles yet. Create one with: thr config init");
        return;
    }
    let current = cfg.active_profile_name(None);
    let mut names: Vec<&String> = cfg.profiles.keys().collect();
    names.sort();
    for name in names {
        if *name == current {
            println!("{name} (default)");
        } else {
            println!("{name}");
        }
    }
}

fn use_profile(name: String) -> Result<(), CliError> {
    let mut cfg = config::load_config_or_default();
    require_profile(&cfg, &name)?;
    cfg.default_profile = Some(name.clone());
    config::save_config(&cfg)?;
    eprintln!("✓ '{name}' is now the default profile");
    Ok(())
}

fn set_key(global: &GlobalOpts, profile: Option<String>) -> Result<(), CliError> {
    let cfg = config::load_config_or_default();
    let name = profile.unwrap_or_else(|| config::active_profile_name(global, &cfg));
    require_profile(&cfg, &name)?;
    let key = read_api_key()?;
    thr_config::store_api_key(&name, &key)?;
    eprintln!("✓ Keyring entry updated for profile '{name}'");
    Ok(())
}

fn require_profile(cfg: &Config, name: &str) -> Result<(), CliError> {
    if cfg.profiles.contains_key(name) {
        Ok(())
    } else {
        Err(CliError::ProfileNotFound {
            name: name.to_owned(),
            available: config::available_profiles(cfg),
        })
    }
}

// ── Interactive setup ───────────────────────────────────────────────

fn interactive(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "prompt".into(),
        reason: e.to_string(),
    }
}

fn read_api_key() -> Result<String, CliError> {
    let key = rpassword::prompt_password("Registry API key: ").map_err(interactive)?;
    let key = key.trim();
    if key.is_empty() {
        return Err(CliError::Validation {
            field: "api_key".into(),
            reason: "an API key is required".into(),
        });
    }
    Ok(key.to_owned())
}

/// Keyring when chosen (returns `None`), otherwise the key to write into
/// the profile as plaintext.
fn choose_key_storage(key: String, profile: &str) -> Result<Option<String>, CliError> {
    let keyring = Select::new()
        .with_prompt("Keep the API key in")
        .items(&["the OS keyring", "config.toml (plaintext)"])
        .default(0)
        .interact()
        .map_err(interactive)?
        == 0;
    if keyring {
        thr_config::store_api_key(profile, &key)?;
        Ok(None)
    } else {
        Ok(Some(key))
    }
}

fn init() -> Result<(), CliError> {
    let path = config::config_path();
    eprintln!("Setting up a THR registry profile in {}\n", path.display());

    let name: String = Input::new()
        .with_prompt("Profile")
        .default("default".into())
        .interact_text()
        .map_err(interactive)?;
    let url: String = Input::new()
        .with_prompt("Registry URL")
        .validate_with(|s: &String| thr_config::parse_url(s).map(drop).map_err(|e| e.to_string()))
        .interact_text()
        .map_err(interactive)?;
    let api_key = choose_key_storage(read_api_key()?, &name)?;

    let mut cfg = config::load_config_or_default();
    cfg.profiles.insert(
        name.clone(),
        Profile {
            url,
            api_key,
            ..Profile::default()
        },
    );
    cfg.default_profile = Some(name.clone());
    config::save_config(&cfg)?;

    eprintln!("\n✓ Saved profile '{name}' as the default");
    eprintln!("  Try: thr families list");
    Ok(())
}
