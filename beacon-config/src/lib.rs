use envconfig::Envconfig;
use lazy_static::lazy_static;

#[derive(Debug, Envconfig)]
pub struct Config {
    #[envconfig(from = "BEACON_LOG_LEVEL", default = "info")]
    pub log_level: String,
    /// Initial axis order flag of newly constructed geometry vectors.
    #[envconfig(from = "BEACON_GEOMETRY_FLIP_AXIS_ORDER", default = "false")]
    pub geometry_flip_axis_order: bool,
    /// Byte order emitted by the WKB writer: `little`/`ndr` or `big`/`xdr`.
    #[envconfig(from = "BEACON_WKB_BYTE_ORDER", default = "little")]
    pub wkb_byte_order: String,
    //Memory size in MB, 0 means unbounded
    #[envconfig(from = "BEACON_GEOMETRY_MEMORY_LIMIT", default = "0")]
    pub geometry_memory_limit: usize,
}

impl Config {
    pub fn init() -> Config {
        Config::init_from_env().expect("Failed to load config")
    }

    /// Memory limit of the default geometry pool in bytes, `None` when unbounded.
    pub fn geometry_memory_limit_bytes(&self) -> Option<usize> {
        match self.geometry_memory_limit {
            0 => None,
            mb => Some(mb.saturating_mul(1024 * 1024)),
        }
    }
}

lazy_static! {
    pub static ref CONFIG: Config = Config::init();
}
