use std::fmt::Display;
use std::marker::PhantomData;

use treecode::{ArrayDecoder, Encode};

use crate::error::CallError;

/// A function callable by name.
///
/// Implemented for every `Fn(P0, .., Pn) -> Result<R, E>` with up to eleven
/// parameters, where each parameter decodes, the result encodes, and the
/// error displays. `Args` is the parameter tuple; it only exists so the
/// per-arity impls do not overlap and is inferred at registration.
pub trait Handler<Args>: Send + Sync + 'static {
    /// Number of parameters. Requests with any other count are rejected
    /// before `invoke`.
    fn arity(&self) -> usize;

    /// Decodes the parameters in order and calls the function.
    fn invoke(&self, params: &mut ArrayDecoder<'_, '_>) -> Result<Box<dyn Encode>, CallError>;
}

macro_rules! count {
    () => { 0usize };
    ($head:ident $($tail:ident)*) => { 1usize + count!($($tail)*) };
}

macro_rules! impl_handler {
    ($($param:ident),*) => {
        impl<Func, Out, Fail, $($param,)*> Handler<($($param,)*)> for Func
        where
            Func: Fn($($param),*) -> Result<Out, Fail> + Send + Sync + 'static,
            Out: Encode + 'static,
            Fail: Display,
            $($param: treecode::Decode,)*
        {
            fn arity(&self) -> usize {
                count!($($param)*)
            }

            #[allow(non_snake_case, unused_variables)]
            fn invoke(&self, params: &mut ArrayDecoder<'_, '_>) -> Result<Box<dyn Encode>, CallError> {
                $(let $param = params.decode::<$param>().map_err(CallError::BadArguments)?;)*
                match (self)($($param),*) {
                    Ok(ret) => Ok(Box::new(ret)),
                    Err(e) => Err(CallError::Remote(e.to_string())),
                }
            }
        }
    };
}

impl_handler!();
impl_handler!(P0);
impl_handler!(P0, P1);
impl_handler!(P0, P1, P2);
impl_handler!(P0, P1, P2, P3);
impl_handler!(P0, P1, P2, P3, P4);
impl_handler!(P0, P1, P2, P3, P4, P5);
impl_handler!(P0, P1, P2, P3, P4, P5, P6);
impl_handler!(P0, P1, P2, P3, P4, P5, P6, P7);
impl_handler!(P0, P1, P2, P3, P4, P5, P6, P7, P8);
impl_handler!(P0, P1, P2, P3, P4, P5, P6, P7, P8, P9);
impl_handler!(P0, P1, P2, P3, P4, P5, P6, P7, P8, P9, P10);

/// Object-safe view of a registered handler.
pub(crate) trait Method: Send + Sync {
    fn arity(&self) -> usize;
    fn invoke(&self, params: &mut ArrayDecoder<'_, '_>) -> Result<Box<dyn Encode>, CallError>;
}

/// Pins a handler to the parameter tuple it was registered with.
pub(crate) struct Erased<H, Args> {
    handler: H,
    _args: PhantomData<fn(Args)>,
}

impl<H, Args> Erased<H, Args> {
    pub(crate) fn new(handler: H) -> Self {
        Self {
            handler,
            _args: PhantomData,
        }
    }
}

impl<H, Args> Method for Erased<H, Args>
where
    H: Handler<Args>,
    Args: 'static,
{
    fn arity(&self) -> usize {
        self.handler.arity()
    }

    fn invoke(&self, params: &mut ArrayDecoder<'_, '_>) -> Result<Box<dyn Encode>, CallError> {
        self.handler.invoke(params)
    }
}
