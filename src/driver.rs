use crate::I2cExt;
use crate::MuxError;

/// Register-level driver shared by all single-control-byte multiplexers (TCA954x/PCA954x).
///
/// The chip has no register address: writing one byte routes every channel whose bit is set,
/// reading one byte returns the current routing.  The driver remembers which channel it routed
/// last so that repeated transactions on the same channel skip the select write.
pub struct Driver<I2C> {
    i2c: I2C,
    addr: u8,
    selected: Option<u8>,
    verify: bool,
}

impl<I2C> Driver<I2C> {
    pub fn new(i2c: I2C, addr: u8) -> Self {
        Self {
            i2c,
            addr,
            selected: None,
            verify: false,
        }
    }

    /// Read back the control register after every select write.
    pub fn set_verification(&mut self, verify: bool) {
        self.verify = verify;
    }

    pub fn address(&self) -> u8 {
        self.addr
    }

    /// Channel that is currently routed, as far as the driver knows.
    pub fn selected(&self) -> Option<u8> {
        self.selected
    }

    pub(crate) fn i2c(&mut self) -> &mut I2C {
        &mut self.i2c
    }

    pub fn release(self) -> I2C {
        self.i2c
    }
}

impl<I2C: crate::I2cBus> Driver<I2C> {
    /// Route exactly `channel` to the upstream bus, unless it already is.
    pub(crate) fn select(&mut self, channel: u8) -> Result<(), MuxError<I2C::Error>> {
        if self.selected == Some(channel) {
            trace!("mux {=u8:#x}: channel {=u8} already selected", self.addr, channel);
            return Ok(());
        }

        let mask = 1u8 << channel;
        self.write_routing(mask)?;
        self.selected = Some(channel);
        debug!("mux {=u8:#x}: selected channel {=u8}", self.addr, channel);
        Ok(())
    }

    /// Disconnect all downstream channels.
    pub(crate) fn disable_all(&mut self) -> Result<(), MuxError<I2C::Error>> {
        self.write_routing(0x00)?;
        debug!("mux {=u8:#x}: all channels disabled", self.addr);
        Ok(())
    }

    fn write_routing(&mut self, mask: u8) -> Result<(), MuxError<I2C::Error>> {
        // Whatever happens below, the chip's routing is no longer known for sure.
        self.selected = None;

        if let Err(e) = self.i2c.write_ctrl(self.addr, mask) {
            warn!("mux {=u8:#x}: routing write {=u8:#b} failed", self.addr, mask);
            return Err(MuxError::Bus(e));
        }

        if self.verify {
            let actual = self.i2c.read_ctrl(self.addr).map_err(MuxError::Bus)?;
            if actual != mask {
                warn!(
                    "mux {=u8:#x}: routing readback {=u8:#b}, expected {=u8:#b}",
                    self.addr,
                    actual,
                    mask
                );
                return Err(MuxError::SelectMismatch {
                    expected: mask,
                    actual,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::Driver;
    use crate::MuxError;
    use embedded_hal::i2c::ErrorKind;
    use embedded_hal_mock::eh1::i2c as mock_i2c;

    #[test]
    fn select_is_elided_for_same_channel() {
        let expectations = [
            mock_i2c::Transaction::write(0x70, vec![0b0000_0100]),
            mock_i2c::Transaction::write(0x70, vec![0b1000_0000]),
        ];
        let mut bus = mock_i2c::Mock::new(&expectations);

        let mut drv = Driver::new(bus.clone(), 0x70);
        assert_eq!(drv.selected(), None);
        drv.select(2).unwrap();
        drv.select(2).unwrap();
        drv.select(7).unwrap();
        assert_eq!(drv.selected(), Some(7));

        bus.done();
    }

    #[test]
    fn failed_select_forgets_routing() {
        let expectations = [
            mock_i2c::Transaction::write(0x71, vec![0b0000_0010]),
            mock_i2c::Transaction::write(0x71, vec![0b0000_0001]).with_error(ErrorKind::Other),
            mock_i2c::Transaction::write(0x71, vec![0b0000_0010]),
        ];
        let mut bus = mock_i2c::Mock::new(&expectations);

        let mut drv = Driver::new(bus.clone(), 0x71);
        drv.select(1).unwrap();
        assert_eq!(drv.select(0), Err(MuxError::Bus(ErrorKind::Other)));
        assert_eq!(drv.selected(), None);
        // channel 1 is no longer assumed routed, so it is written again
        drv.select(1).unwrap();

        bus.done();
    }

    #[test]
    fn verification_detects_mismatch() {
        let expectations = [
            mock_i2c::Transaction::write(0x70, vec![0b0010_0000]),
            mock_i2c::Transaction::read(0x70, vec![0b0010_0000]),
            mock_i2c::Transaction::write(0x70, vec![0b0000_1000]),
            mock_i2c::Transaction::read(0x70, vec![0b0000_0000]),
        ];
        let mut bus = mock_i2c::Mock::new(&expectations);

        let mut drv = Driver::new(bus.clone(), 0x70);
        drv.set_verification(true);
        drv.select(5).unwrap();
        assert_eq!(
            drv.select(3),
            Err(MuxError::SelectMismatch {
                expected: 0b0000_1000,
                actual: 0,
            })
        );
        assert_eq!(drv.selected(), None);

        bus.done();
    }

    #[test]
    fn disable_all_writes_zero() {
        let expectations = [
            mock_i2c::Transaction::write(0x70, vec![0b0000_0001]),
            mock_i2c::Transaction::write(0x70, vec![0x00]),
            mock_i2c::Transaction::write(0x70, vec![0b0000_0001]),
        ];
        let mut bus = mock_i2c::Mock::new(&expectations);

        let mut drv = Driver::new(bus.clone(), 0x70);
        drv.select(0).unwrap();
        drv.disable_all().unwrap();
        assert_eq!(drv.selected(), None);
        drv.select(0).unwrap();

        bus.done();
    }
}
