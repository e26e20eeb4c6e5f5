use std::fs::read_to_string;
use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;

use clap::Parser;
use engine::config::DedicatedBearerDefaults;
use engine::model::Ambr;
use engine::EngineConfig;
use serde::{Deserialize, Serialize};

/// Command-line entry point: a single `--config`/`-c` flag pointing at a
/// TOML file, mirroring the teacher's `Cli`.
#[derive(Parser)]
#[command(
    name = env!("CARGO_PKG_NAME"),
    about = env!("CARGO_PKG_DESCRIPTION"),
    version = env!("CARGO_PKG_VERSION"),
)]
struct Cli {
    #[arg(long, short)]
    config: String,
}

#[derive(Debug, Clone, Copy, Default)]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl FromStr for LogLevel {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Ok(match value.to_ascii_lowercase().as_str() {
            "error" => Self::Error,
            "warn" => Self::Warn,
            "info" => Self::Info,
            "debug" => Self::Debug,
            "trace" => Self::Trace,
            other => anyhow::bail!("unknown log level: {other}"),
        })
    }
}

impl LogLevel {
    pub fn as_level(&self) -> log::Level {
        match self {
            Self::Error => log::Level::Error,
            Self::Warn => log::Level::Warn,
            Self::Info => log::Level::Info,
            Self::Debug => log::Level::Debug,
            Self::Trace => log::Level::Trace,
        }
    }
}

impl<'de> Deserialize<'de> for LogLevel {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        LogLevel::from_str(&raw).map_err(serde::de::Error::custom)
    }
}

impl Serialize for LogLevel {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let raw = match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        };
        serializer.serialize_str(raw)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Log {
    #[serde(default)]
    pub level: LogLevel,
}

/// The demonstration QoS/TFT figures `sgw_no_pcef_create_dedicated_bearer`
/// (§4.5.5) stamps onto the Create Bearer Request it synthesizes, exposed as
/// the `sgw.dedicated-bearer` TOML table per §11.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct DedicatedBearer {
    #[serde(default = "DedicatedBearer::default_qci")]
    pub qci: u8,
    #[serde(default = "DedicatedBearer::default_pci")]
    pub pci: bool,
    #[serde(default = "DedicatedBearer::default_priority_level")]
    pub priority_level: u8,
    #[serde(default = "DedicatedBearer::default_pvi")]
    pub pvi: bool,
    #[serde(default = "DedicatedBearer::default_gbr_ul_bps")]
    pub gbr_ul_bps: u64,
    #[serde(default = "DedicatedBearer::default_gbr_dl_bps")]
    pub gbr_dl_bps: u64,
    #[serde(default = "DedicatedBearer::default_mbr_ul_bps")]
    pub mbr_ul_bps: u64,
    #[serde(default = "DedicatedBearer::default_mbr_dl_bps")]
    pub mbr_dl_bps: u64,
    #[serde(default = "DedicatedBearer::default_remote_port")]
    pub remote_port: u16,
}

impl DedicatedBearer {
    fn default_qci() -> u8 {
        5
    }

    fn default_pci() -> bool {
        true
    }

    fn default_priority_level() -> u8 {
        7
    }

    fn default_pvi() -> bool {
        true
    }

    fn default_gbr_ul_bps() -> u64 {
        32_000
    }

    fn default_gbr_dl_bps() -> u64 {
        32_000
    }

    fn default_mbr_ul_bps() -> u64 {
        48_000
    }

    fn default_mbr_dl_bps() -> u64 {
        48_000
    }

    fn default_remote_port() -> u16 {
        55_555
    }
}

impl Default for DedicatedBearer {
    fn default() -> Self {
        Self {
            qci: Self::default_qci(),
            pci: Self::default_pci(),
            priority_level: Self::default_priority_level(),
            pvi: Self::default_pvi(),
            gbr_ul_bps: Self::default_gbr_ul_bps(),
            gbr_dl_bps: Self::default_gbr_dl_bps(),
            mbr_ul_bps: Self::default_mbr_ul_bps(),
            mbr_dl_bps: Self::default_mbr_dl_bps(),
            remote_port: Self::default_remote_port(),
        }
    }
}

impl From<DedicatedBearer> for DedicatedBearerDefaults {
    fn from(value: DedicatedBearer) -> Self {
        Self {
            qci: value.qci,
            pci: value.pci,
            priority_level: value.priority_level,
            pvi: value.pvi,
            gbr_ul_bps: value.gbr_ul_bps,
            gbr_dl_bps: value.gbr_dl_bps,
            mbr_ul_bps: value.mbr_ul_bps,
            mbr_dl_bps: value.mbr_dl_bps,
            remote_port: value.remote_port,
        }
    }
}

/// The gateway's own addresses and the spec's hard-coded demonstration
/// figures, each overridable (§11).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Sgw {
    #[serde(default = "Sgw::default_s11_ipv4")]
    pub s11_ipv4: Ipv4Addr,
    #[serde(default = "Sgw::default_s1u_ipv4")]
    pub s1u_ipv4: Ipv4Addr,
    #[serde(default = "Sgw::default_ambr_dl_bps")]
    pub ambr_dl_bps: u64,
    #[serde(default = "Sgw::default_ambr_ul_bps")]
    pub ambr_ul_bps: u64,
    #[serde(default)]
    pub dedicated_bearer: DedicatedBearer,
}

impl Sgw {
    fn default_s11_ipv4() -> Ipv4Addr {
        Ipv4Addr::UNSPECIFIED
    }

    fn default_s1u_ipv4() -> Ipv4Addr {
        Ipv4Addr::UNSPECIFIED
    }

    fn default_ambr_dl_bps() -> u64 {
        100_000_000
    }

    fn default_ambr_ul_bps() -> u64 {
        40_000_000
    }
}

impl Default for Sgw {
    fn default() -> Self {
        Self {
            s11_ipv4: Self::default_s11_ipv4(),
            s1u_ipv4: Self::default_s1u_ipv4(),
            ambr_dl_bps: Self::default_ambr_dl_bps(),
            ambr_ul_bps: Self::default_ambr_ul_bps(),
            dedicated_bearer: DedicatedBearer::default(),
        }
    }
}

/// The bundled in-process IPv4 PAA pool's address range. The pool
/// implementation itself stays an external collaborator per the engine's
/// own spec (§6); this is only the default one the standalone binary ships
/// with.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Paa {
    #[serde(default = "Paa::default_start")]
    pub v4_pool_start: Ipv4Addr,
    #[serde(default = "Paa::default_end")]
    pub v4_pool_end: Ipv4Addr,
}

impl Paa {
    fn default_start() -> Ipv4Addr {
        Ipv4Addr::new(10, 45, 0, 1)
    }

    fn default_end() -> Ipv4Addr {
        Ipv4Addr::new(10, 45, 255, 254)
    }
}

impl Default for Paa {
    fn default() -> Self {
        Self {
            v4_pool_start: Self::default_start(),
            v4_pool_end: Self::default_end(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    #[serde(default)]
    pub sgw: Sgw,
    #[serde(default)]
    pub paa: Paa,
    #[serde(default)]
    pub log: Log,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let cli = Cli::parse();
        Ok(toml::from_str(&read_to_string(&cli.config)?)?)
    }

    pub fn s11_address(&self) -> IpAddr {
        IpAddr::V4(self.sgw.s11_ipv4)
    }

    pub fn s1u_address(&self) -> IpAddr {
        IpAddr::V4(self.sgw.s1u_ipv4)
    }

    /// Builds the engine's own configuration surface from the loaded file.
    pub fn to_engine_config(&self) -> EngineConfig {
        EngineConfig {
            s11_address: self.s11_address(),
            s1u_address: self.s1u_address(),
            default_ambr: Ambr {
                dl_bps: self.sgw.ambr_dl_bps,
                ul_bps: self.sgw.ambr_ul_bps,
            },
            dedicated_bearer: self.sgw.dedicated_bearer.into(),
        }
    }
}
