//! Connection credentials from a profile entry or a Cloud Foundry binding.

use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};

use crate::driver::ConnectParams;
use crate::{Error, Result};

/// Environment variable carrying Cloud Foundry service bindings.
pub const VCAP_SERVICES: &str = "VCAP_SERVICES";

const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Profile credentials for one HANA Cloud target.
///
/// Host, port, user, password and schema may be omitted when
/// `cf_service_name` names a bound `hana` service; [`resolve`](Self::resolve)
/// fills them in and rejects anything still missing.
#[derive(Clone, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(default, alias = "dbname")]
    pub database: String,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default, deserialize_with = "port_from_any")]
    pub port: Option<u16>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default, alias = "pass", skip_serializing)]
    pub password: Option<String>,
    #[serde(default)]
    pub schema: Option<String>,
    #[serde(default)]
    pub cf_service_name: Option<String>,
    /// Seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,
}

fn default_connect_timeout() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_SECS
}

impl Default for Credentials {
    fn default() -> Self {
        Self {
            database: String::new(),
            host: None,
            port: None,
            user: None,
            password: None,
            schema: None,
            cf_service_name: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT_SECS,
        }
    }
}

/// Ports show up as numbers in profiles and as strings in VCAP bindings.
#[derive(Deserialize)]
#[serde(untagged)]
enum PortValue {
    Number(u16),
    Text(String),
}

impl PortValue {
    fn into_port<E: serde::de::Error>(self) -> std::result::Result<u16, E> {
        match self {
            PortValue::Number(n) => Ok(n),
            PortValue::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| E::custom(format!("invalid port \"{s}\""))),
        }
    }
}

fn port_from_any<'de, D: Deserializer<'de>>(de: D) -> std::result::Result<Option<u16>, D::Error> {
    Option::<PortValue>::deserialize(de)?
        .map(PortValue::into_port)
        .transpose()
}

#[derive(Deserialize)]
struct VcapDocument {
    #[serde(default)]
    hana: Vec<VcapService>,
}

#[derive(Deserialize)]
struct VcapService {
    name: String,
    #[serde(default)]
    credentials: VcapCredentials,
}

#[derive(Deserialize, Default)]
struct VcapCredentials {
    schema: Option<String>,
    user: Option<String>,
    password: Option<String>,
    host: Option<String>,
    #[serde(default, deserialize_with = "port_from_any")]
    port: Option<u16>,
}

impl Credentials {
    pub const TYPE: &'static str = "saphanacloud";

    /// Decode a profile entry and resolve it.
    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        let creds: Credentials = serde_json::from_value(value)
            .map_err(|e| Error::Configuration(format!("invalid credentials: {e}")))?;
        creds.resolve()
    }

    /// Fill in a Cloud Foundry binding from the process environment, then
    /// validate.
    pub fn resolve(self) -> Result<Self> {
        let vcap = match self.cf_service_name {
            Some(_) => Some(std::env::var(VCAP_SERVICES).map_err(|_| {
                Error::Configuration(format!(
                    "cf_service_name is set but {VCAP_SERVICES} is not available"
                ))
            })?),
            None => None,
        };
        self.resolve_with(vcap.as_deref())
    }

    /// [`resolve`](Self::resolve) with the VCAP document supplied directly.
    pub fn resolve_with(mut self, vcap_services: Option<&str>) -> Result<Self> {
        if let Some(service_name) = self.cf_service_name.clone() {
            let doc = vcap_services.ok_or_else(|| {
                Error::Configuration(format!(
                    "cf_service_name is set but {VCAP_SERVICES} is not available"
                ))
            })?;
            let doc: VcapDocument = serde_json::from_str(doc).map_err(|e| {
                Error::Configuration(format!("invalid {VCAP_SERVICES} document: {e}"))
            })?;
            let service = doc
                .hana
                .into_iter()
                .find(|s| s.name == service_name)
                .ok_or_else(|| {
                    Error::Configuration(format!(
                        "no Cloud Foundry hana service named \"{service_name}\" is bound"
                    ))
                })?;
            let c = service.credentials;
            self.schema = c.schema;
            self.user = c.user;
            self.password = c.password;
            self.host = c.host;
            self.port = c.port;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        let missing: Vec<&str> = [
            ("schema", self.schema.is_none()),
            ("user", self.user.is_none()),
            ("password", self.password.is_none()),
            ("host", self.host.is_none()),
            ("port", self.port.is_none()),
        ]
        .into_iter()
        .filter_map(|(field, absent)| absent.then_some(field))
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::Configuration(format!(
                "One or more required credentials are None: {}",
                missing.join(", ")
            )))
        }
    }

    pub fn connect_params(&self) -> Result<ConnectParams> {
        self.validate()?;
        Ok(ConnectParams {
            host: self.host.clone().unwrap_or_default(),
            port: self.port.unwrap_or_default(),
            user: self.user.clone().unwrap_or_default(),
            password: self.password.clone().unwrap_or_default(),
            schema: self.schema.clone().unwrap_or_default(),
            connect_timeout: self.connect_timeout(),
        })
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout)
    }

    /// Field used to tell targets apart in logs.
    pub fn unique_field(&self) -> Option<&str> {
        self.host.as_deref()
    }

    /// Keys shown by `debug` output. The password is never listed.
    pub fn connection_keys() -> &'static [&'static str] {
        &["host", "port", "user", "database", "schema", "connect_timeout"]
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("database", &self.database)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("schema", &self.schema)
            .field("cf_service_name", &self.cf_service_name)
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}
