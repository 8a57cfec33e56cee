//! Support for the `TCA9548A` "Low-Voltage 8-Channel I2C Switch with Reset"
//!
//! The `PCA9548A` is register-compatible and works with the same driver.

/// `TCA9548A` "Low-Voltage 8-Channel I2C Switch with Reset"
pub type Tca9548a<M> = crate::Multiplexer<M, 8>;

impl<I2C> Tca9548a<core::cell::RefCell<crate::Driver<I2C>>>
where
    I2C: crate::I2cBus,
{
    pub fn new(i2c: I2C, a0: bool, a1: bool, a2: bool) -> Self {
        Self::with_mutex(i2c, a0, a1, a2)
    }
}

impl<I2C, M> Tca9548a<M>
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
            ch4: self.virtual_bus(4),
            ch5: self.virtual_bus(5),
            ch6: self.virtual_bus(6),
            ch7: self.virtual_bus(7),
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
    pub ch4: crate::VirtualBus<'a, M>,
    pub ch5: crate::VirtualBus<'a, M>,
    pub ch6: crate::VirtualBus<'a, M>,
    pub ch7: crate::VirtualBus<'a, M>,
    _i: core::marker::PhantomData<I2C>,
}

#[cfg(test)]
mod tests {
    use embedded_hal::i2c::I2c;
    use embedded_hal_mock::eh1::i2c as mock_i2c;

    #[test]
    fn tca9548a() {
        let expectations = [
            // channel 3 routed first
            mock_i2c::Transaction::write(0x74, vec![0b0000_1000]),
            mock_i2c::Transaction::write(0x40, vec![0x00, 0x01]),
            // switching to channel 5: exactly one select, then the data write
            mock_i2c::Transaction::write(0x74, vec![0b0010_0000]),
            mock_i2c::Transaction::write(0x40, vec![0x00, 0x02]),
            // same device address on two channels is fine, they are separate buses
            mock_i2c::Transaction::write(0x74, vec![0b0000_1000]),
            mock_i2c::Transaction::write_read(0x40, vec![0x00], vec![0x01]),
            mock_i2c::Transaction::write(0x74, vec![0b1000_0000]),
            mock_i2c::Transaction::read(0x29, vec![0xa0]),
            mock_i2c::Transaction::write(0x74, vec![0b0000_0001]),
            mock_i2c::Transaction::write(0x29, vec![0x80]),
        ];
        let mut bus = mock_i2c::Mock::new(&expectations);

        let mut mux = super::Tca9548a::new(bus.clone(), false, false, true);
        let mut ch = mux.split();

        ch.ch3.write(0x40, &[0x00, 0x01]).unwrap();
        ch.ch5.write(0x40, &[0x00, 0x02]).unwrap();

        let mut buf = [0];
        ch.ch3.write_read(0x40, &[0x00], &mut buf).unwrap();
        assert_eq!(buf, [0x01]);

        ch.ch7.read(0x29, &mut buf).unwrap();
        assert_eq!(buf, [0xa0]);
        ch.ch0.write(0x29, &[0x80]).unwrap();

        bus.done();
    }
}
