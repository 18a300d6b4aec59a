/// URL scheme accepted by [`PersistConfig::from_url`].
pub const URL_SCHEME: &str = "trackdb://";

/// Persistence session configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistConfig {
    /// Logical database name, used in logs and URLs
    pub database: String,

    /// Run `Model::validate` on the staged record before a bulk update
    pub validate_updates: bool,
}

impl PersistConfig {
    /// Create a configuration for the named database
    pub fn new(database: &str) -> Self {
        Self {
            database: database.to_string(),
            validate_updates: false,
        }
    }

    /// Set the database name
    pub fn database(mut self, database: &str) -> Self {
        self.database = database.to_string();
        self
    }

    /// Enable or disable validation on bulk updates
    pub fn validate_updates(mut self, enabled: bool) -> Self {
        self.validate_updates = enabled;
        self
    }

    /// Parse from a store URL
    ///
    /// Format: "trackdb://memory/database[?validate_updates=true]"
    ///
    /// # Examples
    ///
    /// ```
    /// use tracked_model::PersistConfig;
    ///
    /// let config = PersistConfig::from_url("trackdb://memory/options?validate_updates=true").unwrap();
    /// assert_eq!(config.database, "options");
    /// assert!(config.validate_updates);
    /// ```
    pub fn from_url(url: &str) -> Result<Self, String> {
        let rest = url
            .strip_prefix(URL_SCHEME)
            .ok_or_else(|| format!("URL must start with '{}'", URL_SCHEME))?;

        let (location, query) = match rest.split_once('?') {
            Some((location, query)) => (location, Some(query)),
            None => (rest, None),
        };

        let (backend, database) = location
            .split_once('/')
            .ok_or_else(|| "Invalid backend/database format".to_string())?;
        if backend != "memory" {
            return Err(format!("Unsupported backend '{}'", backend));
        }

        let mut config = Self::new(database);
        for pair in query.into_iter().flat_map(|q| q.split('&')).filter(|p| !p.is_empty()) {
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| format!("Invalid query parameter '{}'", pair))?;
            match key {
                "validate_updates" => {
                    config.validate_updates = value
                        .parse()
                        .map_err(|_| format!("Invalid boolean '{}' for validate_updates", value))?;
                }
                other => return Err(format!("Unknown parameter '{}'", other)),
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Convert to a store URL
    pub fn to_url(&self) -> String {
        format!(
            "{}memory/{}?validate_updates={}",
            URL_SCHEME, self.database, self.validate_updates
        )
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.database.is_empty() {
            return Err("Database name cannot be empty".to_string());
        }
        Ok(())
    }
}

impl Default for PersistConfig {
    fn default() -> Self {
        Self::new("default")
    }
}
