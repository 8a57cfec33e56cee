//! Support for the `TCA9546A` "Low-Voltage 4-Channel I2C Switch with Reset"
//!
//! The `PCA9546A` is register-compatible and works with the same driver.

/// `TCA9546A` "Low-Voltage 4-Channel I2C Switch with Reset"
pub type Tca9546a<M> = crate::Multiplexer<M, 4>;

impl<I2C> Tca9546a<core::cell::RefCell<crate::Driver<I2C>>>
where
    I2C: crate::I2cBus,
{
    pub fn new(i2c: I2C, a0: bool, a1: bool, a2: bool) -> Self {
        Self::with_mutex(i2c, a0, a1, a2)
    }
}

impl<I2C, M> Tca9546a<M>
where
    I2C: crate::I2cBus,
    M: crate::BusMutex<Bus = crate::Driver<I2C>>,
{
    pub fn with_mutex(i2c: I2C, a0: bool, a1: bool, a2: bool) -> Self {
        Self::from_driver(crate::Driver::new(i2c, crate::mux::address(a0, a1, a2)))
    }

    pub fn split(&mut self) -> Parts<'_, I2C, M> {
        Parts {
            ch0: self.virtual_bus(0),
            ch1: self.virtual_bus(1),
            ch2: self.virtual_bus(2),
            ch3: self.virtual_bus(3),
            _i: core::marker::PhantomData,
        }
    }
}

pub struct Parts<'a, I2C, M = core::cell::RefCell<crate::Driver<I2C>>>
where
    I2C: crate::I2cBus,
    M: crate::BusMutex<Bus = crate::Driver<I2C>>,
{
    pub ch0: crate::VirtualBus<'a, M>,
    pub ch1: crate::VirtualBus<'a, M>,
    pub ch2: crate::VirtualBus<'a, M>,
    pub ch3: crate::VirtualBus<'a, M>,
    _i: core::marker::PhantomData<I2C>,
}

#[cfg(test)]
mod tests {
    use embedded_hal::i2c::I2c;
    use embedded_hal_mock::eh1::i2c as mock_i2c;

    #[test]
    fn tca9546a() {
        let expectations = [
            mock_i2c::Transaction::write(0x71, vec![0b0000_0100]),
            mock_i2c::Transaction::write(0x44, vec![0x24, 0x00]),
            mock_i2c::Transaction::read(0x44, vec![0x61, 0x8b, 0x4d]),
            mock_i2c::Transaction::write(0x71, vec![0b0000_0010]),
            mock_i2c::Transaction::write(0x44, vec![0x24, 0x00]),
        ];
        let mut bus = mock_i2c::Mock::new(&expectations);

        let mut mux = super::Tca9546a::new(bus.clone(), true, false, false);
        assert!(mux.channel(4).is_err());
        let mut ch = mux.split();

        ch.ch2.write(0x44, &[0x24, 0x00]).unwrap();
        let mut buf = [0; 3];
        ch.ch2.read(0x44, &mut buf).unwrap();
        assert_eq!(buf, [0x61, 0x8b, 0x4d]);
        ch.ch1.write(0x44, &[0x24, 0x00]).unwrap();

        bus.done();
    }
}
