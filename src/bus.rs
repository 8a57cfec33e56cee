use embedded_hal::i2c as hal_i2c;

/// Blanket trait for the upstream bus a multiplexer sits on.
pub trait I2cBus: hal_i2c::I2c<hal_i2c::SevenBitAddress> {}

impl<T> I2cBus for T where T: hal_i2c::I2c<hal_i2c::SevenBitAddress> {}

/// Access to register-less devices which expose a single control byte.
pub(crate) trait I2cExt {
    type Error;

    fn write_ctrl(&mut self, addr: u8, value: u8) -> Result<(), Self::Error>;
    fn read_ctrl(&mut self, addr: u8) -> Result<u8, Self::Error>;
}

impl<I2C: I2cBus> I2cExt for I2C {
    type Error = I2C::Error;

    fn write_ctrl(&mut self, addr: u8, value: u8) -> Result<(), Self::Error> {
        self.write(addr, &[value])
    }

    fn read_ctrl(&mut self, addr: u8) -> Result<u8, Self::Error> {
        let mut buf = [0x00];
        self.read(addr, &mut buf)?;
        Ok(buf[0])
    }
}
