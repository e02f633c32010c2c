//! Variable, direction and scope kinds plus the signal handle.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A dense, 1-based identifier for one traced signal within a file.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Handle(u32);

impl Handle {
    /// Creates a handle from its raw 1-based value.
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw 1-based value.
    pub const fn as_raw(self) -> u32 {
        self.0
    }

    /// Creates a handle from a 0-based table index.
    pub const fn from_index(index: usize) -> Self {
        Self(index as u32 + 1)
    }

    /// Returns the 0-based table index, or `None` for the invalid handle 0.
    pub fn index(self) -> Option<usize> {
        (self.0 as usize).checked_sub(1)
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({})", self.0)
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

macro_rules! byte_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($(#[$vmeta:meta])* $variant:ident = $value:literal => $label:literal,)* }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        #[repr(u8)]
        pub enum $name {
            $($(#[$vmeta])* $variant = $value,)*
        }

        impl $name {
            /// Decodes the on-disk byte.
            pub fn from_u8(value: u8) -> Option<Self> {
                match value {
                    $($value => Some(Self::$variant),)*
                    _ => None,
                }
            }

            /// Returns the on-disk byte.
            pub fn as_u8(self) -> u8 {
                self as u8
            }

            /// Returns the keyword used in text dumps.
            pub fn label(self) -> &'static str {
                match self {
                    $(Self::$variant => $label,)*
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        }
    };
}

byte_enum! {
    /// Declared type of a traced variable.
    VarType {
        /// Named event.
        Event = 0 => "event",
        /// Integer.
        Integer = 1 => "integer",
        /// Parameter.
        Parameter = 2 => "parameter",
        /// Real (IEEE-754 double).
        Real = 3 => "real",
        /// Real parameter.
        RealParameter = 4 => "real_parameter",
        /// Register.
        Reg = 5 => "reg",
        /// Supply 0 net.
        Supply0 = 6 => "supply0",
        /// Supply 1 net.
        Supply1 = 7 => "supply1",
        /// Time variable.
        Time = 8 => "time",
        /// Tri-state net.
        Tri = 9 => "tri",
        /// Wired-AND tri net.
        TriAnd = 10 => "triand",
        /// Wired-OR tri net.
        TriOr = 11 => "trior",
        /// Charge-storage tri net.
        TriReg = 12 => "trireg",
        /// Pull-down tri net.
        Tri0 = 13 => "tri0",
        /// Pull-up tri net.
        Tri1 = 14 => "tri1",
        /// Wired-AND net.
        WAnd = 15 => "wand",
        /// Plain wire.
        Wire = 16 => "wire",
        /// Wired-OR net.
        WOr = 17 => "wor",
        /// Port.
        Port = 18 => "port",
        /// Array.
        Array = 19 => "array",
        /// Real-valued time.
        RealTime = 20 => "realtime",
        /// Variable-length string.
        GenString = 21 => "string",
    }
}

impl VarType {
    /// True for the types whose values are stored as doubles.
    pub fn is_real(self) -> bool {
        matches!(self, Self::Real | Self::RealParameter | Self::RealTime)
    }
}

byte_enum! {
    /// Port direction of a variable.
    VarDir {
        /// No direction.
        Implicit = 0 => "implicit",
        /// Input port.
        Input = 1 => "input",
        /// Output port.
        Output = 2 => "output",
        /// Bidirectional port.
        InOut = 3 => "inout",
    }
}

byte_enum! {
    /// Kind of a hierarchy scope.
    ScopeType {
        /// Module instance.
        Module = 0 => "module",
        /// Task.
        Task = 1 => "task",
        /// Function.
        Function = 2 => "function",
        /// Named begin block.
        Begin = 3 => "begin",
        /// Named fork block.
        Fork = 4 => "fork",
    }
}
