pub mod bit_util;
