use core::convert::Infallible;
use embedded_hal::digital as hal_digital;

/// Placeholder for an output line that is not wired up.
///
/// Used as the enable pin of a [`Stepper`][crate::Stepper] whose driver board has EN
/// hard-wired.  Setting it does nothing and never fails.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct NoPin;

impl hal_digital::ErrorType for NoPin {
    type Error = Infallible;
}

impl hal_digital::OutputPin for NoPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Drive `pin` to `level`, folding its error into the stepper's error type.
pub(crate) fn drive<P: hal_digital::OutputPin>(
    pin: &mut P,
    level: bool,
) -> Result<(), crate::StepperError> {
    pin.set_state(level.into()).map_err(|e| {
        crate::StepperError::Pin(hal_digital::Error::kind(&e))
    })
}
