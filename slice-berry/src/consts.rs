//! 通用常量.

/// 单通道颜色.
pub mod gray {
    /// 单通道黑色.
    pub const BLACK: u8 = 0b_0000_0000;

    /// 单通道暗灰色.
    pub const DARK_GRAY: u8 = 0b_0100_0000;

    /// 单通道灰色.
    pub const GRAY: u8 = 0b_1000_0000;

    /// 单通道亮灰色.
    pub const LIGHT_GRAY: u8 = 0b_1100_0000;

    /// 单通道白色.
    pub const WHITE: u8 = 0b_1111_1111;
}

/// 图像栈可接受的切片文件扩展名 (区分大小写, 按后缀匹配).
pub const IMAGE_EXTENSIONS: [&str; 6] = [".tiff", ".tif", ".png", ".jpg", ".jpeg", ".bmp"];

/// 8-bit 标签图像中的前景值, 即 `2^8 - 1`.
pub const POSITIVE_LABEL_8BIT: u16 = u8::MAX as u16;

/// 标签图像中的背景值.
pub const NEGATIVE_LABEL: u16 = 0;

/// 1 GiB 的字节数.
pub const GIB: u64 = 1 << 30;

/// 默认的切片编号起点.
pub const DEFAULT_INDEX_OFFSET: crate::SliceNum = 0;
