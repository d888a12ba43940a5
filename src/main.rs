#![cfg_attr(windows_subsystem, windows_subsystem = "windows")]

use anyhow::Error;
use log::{error, info};
use oneblu::lookup::SystemLookup;
use oneblu::{Config, DnsClient};
use std::thread::sleep;

/// 从命令行参数、环境变量或配置文件中读取配置，然后定期检查
fn main() -> Result<(), Error> {
    log_x::init_log("log", "oneblu-ddns.log")?;
    info!("Starting...");

    let config = Config::load()?;
    info!("loaded config: {config:?}");

    let lookup = SystemLookup::new(&config)?;
    let mut client = DnsClient::connect(&config)?;

    loop {
        if let Err(e) =
            oneblu::check_for_updates(&lookup, &mut client, &config.subdomain, config.rrtype)
        {
            error!("Failed to update DNS record: {e}");
        }
        sleep(config.poll_interval());
    }
}
