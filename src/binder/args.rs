use crate::core::Value;

/// A single operation argument.
///
/// Scalars become bind values; `Vec`/slices become lists for `in`; records
/// (usually `#[derive(Record)]`) become field maps for `.arg.field`.
pub trait Param: Send + Sync {
    fn to_value(&self) -> Value;

    /// Write a generated identity back into the argument. Only records with
    /// an identity field accept it.
    fn assign_identity(&mut self, _id: i64) -> bool {
        false
    }
}

macro_rules! lossless_int_param {
    ($($ty:ty),*) => {
        $(
            impl Param for $ty {
                fn to_value(&self) -> Value {
                    Value::Integer(i64::from(*self))
                }
            }
        )*
    };
}

lossless_int_param!(i8, i16, i32, i64, u8, u16, u32);

macro_rules! wide_int_param {
    ($($ty:ty),*) => {
        $(
            impl Param for $ty {
                fn to_value(&self) -> Value {
                    // Out-of-range values travel as text rather than wrapping.
                    match i64::try_from(*self) {
                        Ok(i) => Value::Integer(i),
                        Err(_) => Value::Text(self.to_string()),
                    }
                }
            }
        )*
    };
}

wide_int_param!(u64, usize, isize);

impl Param for f64 {
    fn to_value(&self) -> Value {
        Value::Float(*self)
    }
}

impl Param for f32 {
    fn to_value(&self) -> Value {
        Value::Float(f64::from(*self))
    }
}

impl Param for bool {
    fn to_value(&self) -> Value {
        Value::Boolean(*self)
    }
}

impl Param for String {
    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }
}

impl Param for str {
    fn to_value(&self) -> Value {
        Value::Text(self.to_string())
    }
}

impl Param for Value {
    fn to_value(&self) -> Value {
        self.clone()
    }
}

impl<T: Param + ?Sized> Param for &T {
    fn to_value(&self) -> Value {
        (**self).to_value()
    }
}

impl<T: Param + ?Sized> Param for Box<T> {
    fn to_value(&self) -> Value {
        (**self).to_value()
    }

    fn assign_identity(&mut self, id: i64) -> bool {
        (**self).assign_identity(id)
    }
}

impl<T: Param> Param for Option<T> {
    fn to_value(&self) -> Value {
        self.as_ref().map_or(Value::Null, Param::to_value)
    }

    fn assign_identity(&mut self, id: i64) -> bool {
        self.as_mut().is_some_and(|inner| inner.assign_identity(id))
    }
}

impl<T: Param> Param for [T] {
    fn to_value(&self) -> Value {
        Value::List(self.iter().map(Param::to_value).collect())
    }
}

impl<T: Param> Param for Vec<T> {
    fn to_value(&self) -> Value {
        self.as_slice().to_value()
    }
}

/// The full argument list of an operation: `()` or a tuple of [`Param`]s.
/// `ARITY` is checked against the statement's declared argument names.
pub trait Arguments: Send {
    const ARITY: usize;

    fn to_values(&self) -> Vec<Value>;

    /// Hand a generated identity to the first argument.
    fn assign_identity(&mut self, id: i64) -> bool;
}

impl Arguments for () {
    const ARITY: usize = 0;

    fn to_values(&self) -> Vec<Value> {
        Vec::new()
    }

    fn assign_identity(&mut self, _id: i64) -> bool {
        false
    }
}

macro_rules! tuple_arguments {
    ($arity:expr; $first:ident $(, $rest:ident)*) => {
        impl<$first: Param $(, $rest: Param)*> Arguments for ($first, $($rest,)*) {
            const ARITY: usize = $arity;

            #[allow(non_snake_case)]
            fn to_values(&self) -> Vec<Value> {
                let ($first, $($rest,)*) = self;
                vec![$first.to_value() $(, $rest.to_value())*]
            }

            fn assign_identity(&mut self, id: i64) -> bool {
                self.0.assign_identity(id)
            }
        }
    };
}

tuple_arguments!(1; A);
tuple_arguments!(2; A, B);
tuple_arguments!(3; A, B, C);
tuple_arguments!(4; A, B, C, D);
tuple_arguments!(5; A, B, C, D, E);
tuple_arguments!(6; A, B, C, D, E, F);
tuple_arguments!(7; A, B, C, D, E, F, G);
tuple_arguments!(8; A, B, C, D, E, F, G, H);
