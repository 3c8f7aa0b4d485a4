//! Runtime settings

use std::time::Duration;

use crate::{
    config::CliArgs,
    core::{
        error::WifiError,
        events::RecoveryDelays,
        types::{DeviceIdentity, ProvisioningMode},
    },
};

/// Runtime configuration settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub interface: String,
    pub ctrl_dir: String,
    pub identity: DeviceIdentity,
    pub mode: ProvisioningMode,
    pub poll_interval: Duration,
    pub provision_on_start: bool,
    pub delays: RecoveryDelays,
}

impl TryFrom<CliArgs> for Settings {
    type Error = WifiError;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        let identity = DeviceIdentity::new(
            args.manufacturer,
            args.model_number,
            args.model_name,
            args.device_name,
        )?;

        let mode = match args.wps_pin {
            Some(pin) => ProvisioningMode::pin(pin)?,
            None => ProvisioningMode::PushButton,
        };

        // A zero interval would make the poll loop spin
        let poll_interval = Duration::from_millis(args.poll_interval_ms.max(1));

        Ok(Settings {
            interface: args.interface,
            ctrl_dir: args.ctrl_dir,
            identity,
            mode,
            poll_interval,
            provision_on_start: args.provision_on_start,
            delays: RecoveryDelays {
                link_lost: Duration::from_millis(args.settle_ms),
                provisioning_succeeded: Duration::from_millis(args.wps_success_settle_ms),
                provisioning_failed: Duration::from_millis(args.settle_ms),
            },
        })
    }
}
