// Encoded widths, computed without encoding

pub const SIZE_OF_U8: usize = 1;
pub const SIZE_OF_BOOL: usize = 1;
pub const SIZE_OF_U16: usize = 2;
pub const SIZE_OF_U32: usize = 4;
pub const SIZE_OF_U64: usize = 8;
pub const SIZE_OF_I64: usize = 8;
pub const SIZE_OF_UINT160: usize = 20;
pub const SIZE_OF_UINT256: usize = 32;

/// Width of a varint holding `value`
pub fn var_uint(value: u64) -> usize {
    if value < 0xfd {
        1
    } else if value <= 0xffff {
        3
    } else if value <= 0xffff_ffff {
        5
    } else {
        9
    }
}

/// Width of length-prefixed bytes of length `len`
pub fn var_bytes(len: usize) -> usize {
    var_uint(len as u64) + len
}

/// Width of a var string after truncation to `max` bytes
pub fn var_string(value: &str, max: usize) -> usize {
    let mut end = value.len().min(max);
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    var_bytes(end)
}

/// Width of a count-prefixed array whose elements sum to `elements`
pub fn array(count: usize, elements: usize) -> usize {
    var_uint(count as u64) + elements
}
