use figment::Jail;

use rag_core::settings::{Settings, SettingsLoader};
use rag_core::Error;

fn write_settings(jail: &Jail, toml: &str) -> figment::error::Result<()> {
    std::fs::create_dir_all(jail.directory().join("configs")).map_err(|e| e.to_string())?;
    jail.create_file("configs/settings.toml", toml)?;
    Ok(())
}

#[test]
fn defaults_when_no_sources() {
    Jail::expect_with(|_jail| {
        let settings = SettingsLoader::new().process_env(false).load().map_err(|e| e.to_string())?;
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.rag.top_k, 4);
        assert_eq!(settings.rag.max_loops, 3);
        assert_eq!(settings.models.chat_model, "mistral-small-latest");
        assert_eq!(settings.paths.vectorstore_dir, "./data/vectorstore");
        assert_eq!(settings.web.provider, "tavily");
        assert!(settings.mistral_api_key.is_empty());
        Ok(())
    });
}

#[test]
fn toml_overrides_defaults_field_by_field() {
    Jail::expect_with(|jail| {
        write_settings(jail, r#"
            [app]
            env = "prod"

            [rag]
            top_k = 7

            [retrieval]
            top_k = 99
        "#)?;
        let settings = SettingsLoader::new().process_env(false).load().map_err(|e| e.to_string())?;
        assert_eq!(settings.app.env, "prod");
        assert_eq!(settings.app.log_level, "INFO");
        assert_eq!(settings.rag.top_k, 7);
        assert_eq!(settings.rag.max_loops, 3);
        Ok(())
    });
}

#[test]
fn environment_beats_toml() {
    Jail::expect_with(|jail| {
        write_settings(jail, "[rag]\ntop_k = 7\n")?;
        jail.set_env("RAG__TOP_K", "9");
        jail.set_env("APP__LOG_LEVEL", "DEBUG");
        let settings = Settings::resolve().map_err(|e| e.to_string())?;
        assert_eq!(settings.rag.top_k, 9);
        assert_eq!(settings.app.log_level, "DEBUG");
        Ok(())
    });
}

#[test]
fn secret_alias_overrides_toml_value() {
    Jail::expect_with(|jail| {
        write_settings(jail, "mistral_api_key = \"from-toml\"\n")?;
        let before = Settings::resolve().map_err(|e| e.to_string())?;
        assert_eq!(before.mistral_api_key, "from-toml");

        jail.set_env("MISTRAL_API_KEY", "from-env");
        let after = Settings::resolve().map_err(|e| e.to_string())?;
        assert_eq!(after.mistral_api_key, "from-env");
        Ok(())
    });
}

#[test]
fn dotenv_sits_between_environment_and_toml() {
    Jail::expect_with(|jail| {
        write_settings(jail, "[rag]\ntop_k = 7\n\n[web]\nprovider = \"toml\"\n")?;
        jail.create_file(".env", "RAG__TOP_K=6\nWEB__PROVIDER=duckduckgo\nTAVILY_API_KEY=dot-key\nUNRELATED=1\n")?;

        let settings = Settings::resolve().map_err(|e| e.to_string())?;
        assert_eq!(settings.rag.top_k, 6);
        assert_eq!(settings.web.provider, "duckduckgo");
        assert_eq!(settings.tavily_api_key, "dot-key");
        // read, not exported
        assert!(std::env::var("WEB__PROVIDER").is_err());

        jail.set_env("RAG__TOP_K", "9");
        let settings = Settings::resolve().map_err(|e| e.to_string())?;
        assert_eq!(settings.rag.top_k, 9);
        assert_eq!(settings.web.provider, "duckduckgo");
        Ok(())
    });
}

#[test]
fn programmatic_overrides_win() {
    Jail::expect_with(|jail| {
        jail.set_env("RAG__TOP_K", "9");
        let settings = SettingsLoader::new()
            .set("rag.top_k", 11)
            .set("app.env", "test")
            .load()
            .map_err(|e| e.to_string())?;
        assert_eq!(settings.rag.top_k, 11);
        assert_eq!(settings.app.env, "test");
        Ok(())
    });
}

#[test]
fn unrelated_environment_is_ignored() {
    Jail::expect_with(|jail| {
        jail.set_env("RAG__NOT_A_FIELD", "x");
        jail.set_env("SOMETHING_ELSE", "y");
        let settings = SettingsLoader::new().load().map_err(|e| e.to_string())?;
        assert_eq!(settings.rag, Settings::default().rag);
        Ok(())
    });
}

#[test]
fn malformed_toml_is_fatal() {
    Jail::expect_with(|jail| {
        write_settings(jail, "[rag\ntop_k = ")?;
        let result = SettingsLoader::new().process_env(false).load();
        assert!(matches!(result, Err(Error::Settings(_))), "got {result:?}");
        Ok(())
    });
}

#[test]
fn wrong_field_type_is_fatal() {
    Jail::expect_with(|jail| {
        write_settings(jail, "[rag]\ntop_k = \"many\"\n")?;
        assert!(SettingsLoader::new().process_env(false).load().is_err());
        Ok(())
    });
}

#[test]
fn every_load_rereads_sources() {
    Jail::expect_with(|jail| {
        write_settings(jail, "[rag]\ntop_k = 2\n")?;
        let loader = SettingsLoader::new().process_env(false);
        assert_eq!(loader.load().map_err(|e| e.to_string())?.rag.top_k, 2);
        write_settings(jail, "[rag]\ntop_k = 3\n")?;
        assert_eq!(loader.load().map_err(|e| e.to_string())?.rag.top_k, 3);
        Ok(())
    });
}

#[test]
fn explicit_root_is_used_for_relative_files() {
    let tmp = tempfile::tempdir().expect("tmp");
    std::fs::create_dir_all(tmp.path().join("configs")).expect("mkdir");
    std::fs::write(tmp.path().join("configs/settings.toml"), "[paths]\ndata_dir = \"corpus\"\n").expect("write");
    let loader = SettingsLoader::new().root(tmp.path()).process_env(false);
    assert_eq!(loader.settings_path(), tmp.path().join("configs/settings.toml"));
    let settings = loader.load().expect("load");
    assert_eq!(settings.paths.data_dir, "corpus");
    assert_eq!(settings.root, tmp.path());
    assert_eq!(settings.data_dir(), tmp.path().join("corpus"));
    assert_eq!(settings.vectorstore_dir(), tmp.path().join("./data/vectorstore"));
}

#[test]
fn absolute_paths_ignore_the_root() {
    let tmp = tempfile::tempdir().expect("tmp");
    let store = tmp.path().join("elsewhere");
    let settings = SettingsLoader::new()
        .root(tmp.path().join("project"))
        .process_env(false)
        .set("paths.vectorstore_dir", store.to_string_lossy().as_ref())
        .load()
        .expect("load");
    assert_eq!(settings.vectorstore_dir(), store);
}

#[test]
fn numeric_looking_secret_stays_a_string() {
    Jail::expect_with(|jail| {
        jail.set_env("MISTRAL_API_KEY", "12345");
        jail.set_env("TAVILY_API_KEY", "[abc]");
        let settings = Settings::resolve().map_err(|e| e.to_string())?;
        assert_eq!(settings.mistral_api_key, "12345");
        assert_eq!(settings.tavily_api_key, "[abc]");
        Ok(())
    });
}

#[test]
fn bool_looking_secret_stays_a_string() {
    Jail::expect_with(|jail| {
        jail.set_env("MISTRAL_API_KEY", "true");
        jail.set_env("APP__ENV", "false");
        let settings = Settings::resolve().map_err(|e| e.to_string())?;
        assert_eq!(settings.mistral_api_key, "true");
        assert_eq!(settings.app.env, "false");
        Ok(())
    });
}

#[test]
fn numeric_looking_string_from_dotenv() {
    Jail::expect_with(|jail| {
        jail.create_file(".env", "APP__ENV=2024
RAG__MAX_LOOPS=5
")?;
        let settings = SettingsLoader::new().process_env(false).load().map_err(|e| e.to_string())?;
        assert_eq!(settings.app.env, "2024");
        assert_eq!(settings.rag.max_loops, 5);
        Ok(())
    });
}

#[test]
fn non_numeric_environment_value_for_number_is_fatal() {
    Jail::expect_with(|jail| {
        jail.set_env("RAG__TOP_K", "several");
        let result = Settings::resolve();
        assert!(matches!(result, Err(Error::Settings(_))), "got {result:?}");
        Ok(())
    });
}
