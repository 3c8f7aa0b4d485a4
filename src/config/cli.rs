//! Command-line argument parsing

use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[clap(name = "wifi-link-supervisor", version, author)]
#[clap(about = "WiFi link supervisor with WPS push-button provisioning")]
pub struct CliArgs {
    /// Wireless network interface name
    #[clap(short, long, default_value = "wlan0")]
    pub interface: String,

    /// Directory holding the wpa_supplicant control sockets
    #[clap(long, default_value = "/var/run/wpa_supplicant")]
    pub ctrl_dir: String,

    /// Manufacturer advertised during WPS (max 64 bytes)
    #[clap(long, default_value = "ESPRESSIF")]
    pub manufacturer: String,

    /// Model number advertised during WPS (max 32 bytes)
    #[clap(long, default_value = "ESP32")]
    pub model_number: String,

    /// Model name advertised during WPS (max 32 bytes)
    #[clap(long, default_value = "ESPRESSIF IOT")]
    pub model_name: String,

    /// Device name advertised during WPS (max 32 bytes)
    #[clap(long, default_value = "ESP STATION")]
    pub device_name: String,

    /// Use WPS PIN mode with this PIN instead of push-button
    #[clap(long)]
    pub wps_pin: Option<String>,

    /// Link status poll interval in milliseconds
    #[clap(long, default_value = "1000")]
    pub poll_interval_ms: u64,

    /// Start WPS right after connecting to wpa_supplicant
    #[clap(long)]
    pub provision_on_start: bool,

    /// Pause before reconnect and after WPS failure, in milliseconds
    #[clap(long, default_value = "10")]
    pub settle_ms: u64,

    /// Pause before connecting after a successful WPS exchange, in milliseconds
    #[clap(long, default_value = "100")]
    pub wps_success_settle_ms: u64,
}
