use std::{env, fmt};

use zlgcan_driver::{zlg::ZlgTransport, BusConfig, Session};

struct Driver<Can>(Can);

impl<Can> Driver<Can>
where
    Can: embedded_can::blocking::Can,
    Can::Frame: fmt::Debug,
    Can::Error: std::error::Error + Send + Sync + 'static,
{
    pub fn echo(&mut self) -> anyhow::Result<()> {
        let frame = self.0.receive()?;
        println!("{:?}", frame);
        self.0.transmit(&frame)?;
        Ok(())
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let busname = env::args().nth(1).unwrap_or_else(|| "0".to_string());
    let baudrate = env::args().nth(2).unwrap_or_else(|| "500K".to_string());

    let can = Session::open(ZlgTransport, &BusConfig::new(busname, baudrate))?;
    let mut driver = Driver(can);
    loop {
        driver.echo()?;
    }
}
