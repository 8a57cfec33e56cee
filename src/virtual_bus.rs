use core::time::Duration;
use embedded_hal::i2c as hal_i2c;

use crate::{BusMutex, Driver, MuxError};

/// One downstream channel of a multiplexer, usable like a plain I2C bus.
///
/// `VirtualBus` is not constructed directly, this type is created by instanciating a multiplexer
/// and then getting access to all its channels using the `.split()` method.
///
/// Every operation locks the multiplexer, routes this channel if it is not routed already, runs
/// the operation on the upstream bus and unlocks again.  No other channel of the same
/// multiplexer can slip a transaction in between the select and the operation.
pub struct VirtualBus<'a, M> {
    channel: u8,
    timeout: Duration,
    mux: &'a M,
}

impl<'a, M, I2C> VirtualBus<'a, M>
where
    I2C: crate::I2cBus,
    M: BusMutex<Bus = Driver<I2C>>,
{
    pub(crate) fn new(channel: u8, timeout: Duration, mux: &'a M) -> Self {
        assert!(channel < 8);
        Self {
            channel,
            timeout,
            mux,
        }
    }

    pub fn channel(&self) -> u8 {
        self.channel
    }

    /// Run `f` with exclusive access to this channel.
    ///
    /// The channel is selected once, then `f` may issue any number of operations on the
    /// upstream bus without another channel's traffic interleaving.  Useful for devices which
    /// need a read-modify-write sequence to be atomic.
    ///
    /// ## Example
    /// ```
    /// # use embedded_hal_mock::eh1::i2c as mock_i2c;
    /// # let expectations = [
    /// #     mock_i2c::Transaction::write(0x70, vec![0b0000_0100]),
    /// #     mock_i2c::Transaction::write_read(0x48, vec![0x01], vec![0x60]),
    /// #     mock_i2c::Transaction::write(0x48, vec![0x01, 0x61]),
    /// # ];
    /// # let mut i2c = mock_i2c::Mock::new(&expectations);
    /// use embedded_hal::i2c::I2c;
    ///
    /// let mut mux = mux_motion::Tca9548a::new(i2c.clone(), false, false, false);
    /// let channels = mux.split();
    ///
    /// channels.ch2.exclusive(|bus| {
    ///     let mut cfg = [0];
    ///     bus.write_read(0x48, &[0x01], &mut cfg)?;
    ///     bus.write(0x48, &[0x01, cfg[0] | 0x01])
    /// }).unwrap();
    /// # i2c.done();
    /// ```
    pub fn exclusive<R, F>(&self, f: F) -> Result<R, MuxError<I2C::Error>>
    where
        F: FnOnce(&mut I2C) -> Result<R, I2C::Error>,
    {
        let channel = self.channel;
        let res = self.mux.lock(self.timeout, |drv| {
            drv.select(channel)?;
            f(drv.i2c()).map_err(MuxError::Bus)
        });
        match res {
            Ok(r) => r,
            Err(e) => {
                warn!("channel {=u8}: timed out waiting for the multiplexer", channel);
                Err(e.into())
            }
        }
    }
}

impl<'a, M, I2C> hal_i2c::ErrorType for VirtualBus<'a, M>
where
    I2C: crate::I2cBus,
    M: BusMutex<Bus = Driver<I2C>>,
{
    type Error = MuxError<I2C::Error>;
}

impl<'a, M, I2C> hal_i2c::I2c for VirtualBus<'a, M>
where
    I2C: crate::I2cBus,
    M: BusMutex<Bus = Driver<I2C>>,
{
    fn read(&mut self, address: u8, read: &mut [u8]) -> Result<(), Self::Error> {
        self.exclusive(|bus| bus.read(address, read))
    }

    fn write(&mut self, address: u8, write: &[u8]) -> Result<(), Self::Error> {
        self.exclusive(|bus| bus.write(address, write))
    }

    fn write_read(
        &mut self,
        address: u8,
        write: &[u8],
        read: &mut [u8],
    ) -> Result<(), Self::Error> {
        self.exclusive(|bus| bus.write_read(address, write, read))
    }

    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [hal_i2c::Operation<'_>],
    ) -> Result<(), Self::Error> {
        self.exclusive(|bus| bus.transaction(address, operations))
    }
}
