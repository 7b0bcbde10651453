#[cfg(test)]
pub mod test {
    use confique::Config;
    use serde::{Deserialize, Serialize};
    use toml::Value;

    use crate::schema::{Field, Schema};

    /// Keypair registry layout: a removal list plus one record per key file.
    pub const KEYPAIR_SCHEMA: &str = r#"
[keypairdb_meta]
removed = { type = "list", default = [] }

[keypairdb."*"]
name = { type = "string", default = "" }
added = { type = "float" }
last_used = { type = "float", default = -1 }
on_interchangeable_storage = { type = "integer", default = -1 }
passphrased = { type = "integer", default = -1 }
last_file_check = { type = "float", default = -1 }
available = { type = "boolean", default = false }
fingerprint = { type = "string" }
"#;

    /// The same layout as [`KEYPAIR_SCHEMA`], built in code.
    pub fn keypair_schema() -> Schema {
        Schema::new()
            .field("keypairdb_meta.removed", Field::list().default(Vec::<Value>::new()))
            .field("keypairdb.*.name", Field::string().default(""))
            .field("keypairdb.*.added", Field::float())
            .field("keypairdb.*.last_used", Field::float().default(-1.0))
            .field(
                "keypairdb.*.on_interchangeable_storage",
                Field::integer().default(-1),
            )
            .field("keypairdb.*.passphrased", Field::integer().default(-1))
            .field("keypairdb.*.last_file_check", Field::float().default(-1.0))
            .field("keypairdb.*.available", Field::boolean().default(false))
            .field("keypairdb.*.fingerprint", Field::string())
    }

    /// Application settings alongside the keypair layout.
    pub fn app_schema() -> Schema {
        Schema::new()
            .field("count", Field::integer().default(0))
            .field("ui.locale", Field::string().default("en"))
            .field("ui.sync_interval", Field::float().default(1.0))
            .section("a")
            .extend(keypair_schema())
    }

    #[derive(Config, Serialize, Deserialize, Debug, PartialEq)]
    pub struct UiConfig {
        /// Interface language.
        #[config(default = "en")]
        pub locale: String,

        /// Seconds between background syncs.
        #[config(default = 1.0)]
        pub sync_interval: f64,

        /// Window geometry, if remembered.
        pub geometry: Option<String>,
    }

    #[derive(Config, Serialize, Deserialize, Debug, PartialEq)]
    pub struct AppConfig {
        #[config(default = 0)]
        pub count: i64,

        #[config(nested)]
        pub ui: UiConfig,
    }

    #[test]
    fn ui_config_loads_defaults() {
        let config = UiConfig::builder().load().unwrap();
        assert_eq!(config.locale, "en");
        assert_eq!(config.sync_interval, 1.0);
        assert_eq!(config.geometry, None);
    }
}
