use core::time::Duration;

use crate::{BusMutex, Driver, MuxError, VirtualBus};

/// How long a transaction waits for the selector lock by default.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Base address of the TCA954x/PCA954x family; the address pins are ORed into the low bits.
pub(crate) const BASE_ADDRESS: u8 = 0x70;

pub(crate) fn address(a0: bool, a1: bool, a2: bool) -> u8 {
    BASE_ADDRESS | ((a2 as u8) << 2) | ((a1 as u8) << 1) | (a0 as u8)
}

/// A multiplexer with `N` downstream channels behind the selector lock `M`.
///
/// Chip-specific constructors and `split()` live with each device, e.g.
/// [`Tca9548a`][crate::Tca9548a].
pub struct Multiplexer<M, const N: u8> {
    mutex: M,
    timeout: Duration,
}

impl<I2C, M, const N: u8> Multiplexer<M, N>
where
    I2C: crate::I2cBus,
    M: BusMutex<Bus = Driver<I2C>>,
{
    /// Number of downstream channels.
    pub const CHANNELS: u8 = N;

    pub(crate) fn from_driver(driver: Driver<I2C>) -> Self {
        Self {
            mutex: BusMutex::create(driver),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Bound the time a transaction waits for other channels to finish.
    ///
    /// Only affects [`VirtualBus`] handles created afterwards.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Read back the control register after each channel switch and fail the transaction
    /// with [`MuxError::SelectMismatch`] if the chip did not take the new routing.
    pub fn with_verification(mut self, verify: bool) -> Self {
        self.mutex.get_mut().set_verification(verify);
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Handle for downstream channel `channel`.  No bus traffic happens here.
    pub fn channel(&self, channel: u8) -> Result<VirtualBus<'_, M>, MuxError<I2C::Error>> {
        if channel >= N {
            return Err(MuxError::InvalidChannel(channel));
        }
        Ok(self.virtual_bus(channel))
    }

    pub(crate) fn virtual_bus(&self, channel: u8) -> VirtualBus<'_, M> {
        VirtualBus::new(channel, self.timeout, &self.mutex)
    }

    /// The channel routed by the last successful select, if any.
    pub fn selected(&self) -> Result<Option<u8>, MuxError<I2C::Error>> {
        Ok(self.mutex.lock(self.timeout, |drv| drv.selected())?)
    }

    /// Disconnect every downstream channel from the upstream bus.
    ///
    /// Waits for in-flight transactions like any channel would.  The next transaction on any
    /// channel selects it again.
    pub fn disable_all(&self) -> Result<(), MuxError<I2C::Error>> {
        match self.mutex.lock(self.timeout, |drv| drv.disable_all()) {
            Ok(res) => res,
            Err(e) => {
                warn!("mux: timed out waiting to disable all channels");
                Err(e.into())
            }
        }
    }

    /// Give back the upstream bus.
    pub fn release(self) -> I2C {
        self.mutex.into_inner().release()
    }
}

#[cfg(test)]
mod tests {
    use crate::MuxError;
    use core::time::Duration;
    use embedded_hal::i2c::I2c;
    use embedded_hal_mock::eh1::i2c as mock_i2c;

    #[test]
    fn address_pins() {
        assert_eq!(super::address(false, false, false), 0x70);
        assert_eq!(super::address(true, false, true), 0x75);
        assert_eq!(super::address(true, true, true), 0x77);
    }

    #[test]
    fn channel_by_index() {
        let expectations = [
            mock_i2c::Transaction::write(0x72, vec![0b1000_0000]),
            mock_i2c::Transaction::write(0x11, vec![0x22]),
        ];
        let mut bus = mock_i2c::Mock::new(&expectations);

        let mux = crate::Tca9548a::new(bus.clone(), false, true, false);
        assert!(matches!(mux.channel(8), Err(MuxError::InvalidChannel(8))));

        let mut ch7 = mux.channel(7).unwrap();
        assert_eq!(ch7.channel(), 7);
        ch7.write(0x11, &[0x22]).unwrap();
        assert_eq!(mux.selected(), Ok(Some(7)));

        bus.done();
    }

    #[test]
    fn disable_all_then_reselect() {
        let expectations = [
            mock_i2c::Transaction::write(0x70, vec![0b0000_0010]),
            mock_i2c::Transaction::write(0x30, vec![0x01]),
            mock_i2c::Transaction::write(0x70, vec![0x00]),
            mock_i2c::Transaction::write(0x70, vec![0b0000_0010]),
            mock_i2c::Transaction::write(0x30, vec![0x02]),
        ];
        let mut bus = mock_i2c::Mock::new(&expectations);

        let mux = crate::Tca9548a::new(bus.clone(), false, false, false);
        let mut ch1 = mux.channel(1).unwrap();

        ch1.write(0x30, &[0x01]).unwrap();
        mux.disable_all().unwrap();
        assert_eq!(mux.selected(), Ok(None));
        ch1.write(0x30, &[0x02]).unwrap();

        bus.done();
    }

    #[test]
    fn builder_options() {
        let expectations = [
            mock_i2c::Transaction::write(0x70, vec![0b0000_0001]),
            mock_i2c::Transaction::read(0x70, vec![0b0000_0001]),
            mock_i2c::Transaction::read(0x68, vec![0x75]),
        ];
        let mut bus = mock_i2c::Mock::new(&expectations);

        let mux = crate::Tca9548a::new(bus.clone(), false, false, false)
            .with_timeout(Duration::from_millis(250))
            .with_verification(true);
        assert_eq!(mux.timeout(), Duration::from_millis(250));

        let mut ch0 = mux.channel(0).unwrap();
        let mut buf = [0];
        ch0.read(0x68, &mut buf).unwrap();
        assert_eq!(buf, [0x75]);

        let _i2c = mux.release();
        bus.done();
    }
}
