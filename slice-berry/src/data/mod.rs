use std::error::Error;
use std::fmt;
use std::path::{Path, PathBuf};

use image::{DynamicImage, GenericImageView};
use log::info;
use ndarray::{Array2, Array3, ArrayView2, ArrayView3, Axis, Ix3, Zip};
use nifti::{IntoNdArray, NiftiObject, ReaderOptions};
use num::traits::AsPrimitive;

use crate::{Idx2d, Idx3d};

mod chart;
pub mod score;

pub use chart::ScoreChart;

cfg_if::cfg_if! {
    if #[cfg(feature = "plot")] {
        mod plot;

        pub use plot::ImgDisplay;
    }
}

/// 图像栈加载错误.
#[derive(Debug)]
pub enum LoadError {
    /// 没有任何切片.
    EmptyStack,

    /// 切片尺寸与第一张切片不一致.
    SliceShapeMismatch {
        /// 第一张切片的 (高, 宽).
        expected: Idx2d,

        /// 出错切片的 (高, 宽).
        found: Idx2d,

        /// 出错切片的路径.
        path: PathBuf,
    },

    /// 图像文件打开或解码错误.
    ImageError(PathBuf, image::ImageError),

    /// nifti 文件打开或解码错误.
    NiftiError(nifti::NiftiError),

    /// nifti 文件不是 3D 体数据. 参数为实际维数.
    NotAVolume(usize),
}

/// 图像栈加载运行时错误.
pub type LoadResult<T> = Result<T, LoadError>;

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyStack => f.write_str("the image stack contains no slices"),
            Self::SliceShapeMismatch {
                expected,
                found,
                path,
            } => write!(
                f,
                "slice `{}` has shape {found:?}, expected {expected:?}",
                path.display()
            ),
            Self::ImageError(path, e) => write!(f, "cannot read image `{}`: {e}", path.display()),
            Self::NiftiError(e) => write!(f, "cannot read nifti volume: {e}"),
            Self::NotAVolume(ndim) => write!(f, "expected a 3D nifti volume, found {ndim} dimensions"),
        }
    }
}

impl Error for LoadError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::ImageError(_, e) => Some(e),
            Self::NiftiError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<nifti::NiftiError> for LoadError {
    #[inline]
    fn from(e: nifti::NiftiError) -> Self {
        Self::NiftiError(e)
    }
}

/// 由同尺寸 2D 切片组成的 3D 图像栈, 按 (z, H, W) 组织, 像素值以 `f32` 保存.
///
/// 8-bit / 16-bit 灰度图像按原始像素值保存, 不做归一化.
#[derive(Debug, Clone)]
pub struct SliceStack {
    data: Array3<f32>,
}

impl SliceStack {
    /// 直接由 (z, H, W) 数组创建. 切片个数为 0 时返回 [`LoadError::EmptyStack`].
    pub fn from_array(data: Array3<f32>) -> LoadResult<Self> {
        if data.len_of(Axis(0)) == 0 {
            return Err(LoadError::EmptyStack);
        }
        Ok(Self { data })
    }

    /// 按 `paths` 给出的顺序依次打开切片图像, 堆叠为图像栈.
    pub fn open_images<P: AsRef<Path>>(paths: &[P]) -> LoadResult<Self> {
        let data = stack_planes::<f32, P>(paths)?;
        let (z, h, w) = data.dim();
        info!("stacked {z} slices of {h}x{w} pixels");
        Ok(Self { data })
    }

    /// 打开 nii 文件格式的 3D 体数据. `path` 为 nii 文件的本地路径.
    pub fn open_nifti<P: AsRef<Path>>(path: P) -> LoadResult<Self> {
        let obj = ReaderOptions::new().read_file(path.as_ref())?;

        // [W, H, z] -> [z, H, W].
        // hint: 原第一维向下增长, 原第二维向右增长.
        let data = obj
            .into_volume()
            .into_ndarray::<f32>()?
            .permuted_axes([2, 1, 0].as_slice());
        let ndim = data.ndim();
        let data = data
            .into_dimensionality::<Ix3>()
            .map_err(|_| LoadError::NotAVolume(ndim))?;
        let data = if data.is_standard_layout() {
            data
        } else {
            data.as_standard_layout().to_owned()
        };

        let (z, h, w) = data.dim();
        info!(
            "loaded nifti volume `{}`: {z} slices of {h}x{w}",
            path.as_ref().display()
        );
        Self::from_array(data)
    }

    /// 获取数据形状大小 (z, H, W).
    #[inline]
    pub fn shape(&self) -> Idx3d {
        self.data.dim()
    }

    /// 获取切片形状大小 (H, W).
    #[inline]
    pub fn slice_shape(&self) -> Idx2d {
        let (_, h, w) = self.shape();
        (h, w)
    }

    /// 获取切片个数.
    #[inline]
    pub fn len_z(&self) -> usize {
        self.shape().0
    }

    /// 获取第 `z_index` 张切片视图.
    ///
    /// 当 `z_index` 越界时 panic.
    #[inline]
    pub fn slice_at(&self, z_index: usize) -> ArrayView2<'_, f32> {
        self.data.index_axis(Axis(0), z_index)
    }

    /// 获取能按升序迭代切片的迭代器.
    #[inline]
    pub fn slice_iter(&self) -> impl ExactSizeIterator<Item = ArrayView2<'_, f32>> {
        self.data.axis_iter(Axis(0))
    }

    /// 获得数据的一份不可变 shallow copy.
    #[inline]
    pub fn data(&self) -> ArrayView3<'_, f32> {
        self.data.view()
    }

    /// 逐像素求所有切片的平均图像.
    pub fn mean_image(&self) -> Array2<f64> {
        let mut acc = Array2::<f64>::zeros(self.slice_shape());
        for s in self.slice_iter() {
            Zip::from(&mut acc).and(&s).for_each(|a, &p| *a += p as f64);
        }
        acc / self.len_z() as f64
    }
}

/// 由同尺寸 2D 标签切片组成的 3D 标签体数据, 按 (z, H, W) 组织.
///
/// 像素值以 `u16` 保存, 同时容纳 8-bit 和 16-bit 标签图像.
#[derive(Debug, Clone)]
pub struct LabelVolume {
    data: Array3<u16>,
}

impl LabelVolume {
    /// 直接由 (z, H, W) 数组创建. 切片个数为 0 时返回 [`LoadError::EmptyStack`].
    pub fn from_array(data: Array3<u16>) -> LoadResult<Self> {
        if data.len_of(Axis(0)) == 0 {
            return Err(LoadError::EmptyStack);
        }
        Ok(Self { data })
    }

    /// 按 `paths` 给出的顺序依次打开标签图像, 堆叠为标签体数据.
    pub fn open_images<P: AsRef<Path>>(paths: &[P]) -> LoadResult<Self> {
        let data = stack_planes::<u16, P>(paths)?;
        let (z, h, w) = data.dim();
        info!("stacked {z} label slices of {h}x{w} pixels");
        Ok(Self { data })
    }

    /// 获取数据形状大小 (z, H, W).
    #[inline]
    pub fn shape(&self) -> Idx3d {
        self.data.dim()
    }

    /// 获取体素个数.
    #[inline]
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// 获取值为 `label` 的体素个数.
    #[inline]
    pub fn count(&self, label: u16) -> usize {
        self.data.iter().filter(|p| **p == label).count()
    }

    /// 获得数据的一份不可变 shallow copy.
    #[inline]
    pub fn data(&self) -> ArrayView3<'_, u16> {
        self.data.view()
    }
}

/// 打开单张图像, 得到 (H, W) 的灰度平面.
///
/// 灰度图像按原样读取; 彩色图像按其原始位深转换为灰度.
pub(crate) fn read_plane<T>(path: &Path) -> LoadResult<Array2<T>>
where
    T: Copy + 'static,
    u8: AsPrimitive<T>,
    u16: AsPrimitive<T>,
{
    fn cast_all<S: AsPrimitive<T>, T: Copy + 'static>(raw: &[S]) -> Vec<T> {
        raw.iter().map(|p| p.as_()).collect()
    }

    let img = image::open(path).map_err(|e| LoadError::ImageError(path.to_owned(), e))?;
    let (w, h) = img.dimensions();
    let color = img.color();
    let raw: Vec<T> = match img {
        DynamicImage::ImageLuma8(buf) => cast_all(buf.as_raw()),
        DynamicImage::ImageLuma16(buf) => cast_all(buf.as_raw()),
        other if color.bytes_per_pixel() == color.channel_count() => {
            cast_all(other.into_luma8().as_raw())
        }
        other => cast_all(other.into_luma16().as_raw()),
    };

    // 长度恰为 `h * w`, 该操作不会生成 `Err`, 可直接 unwrap.
    Ok(Array2::from_shape_vec((h as usize, w as usize), raw).unwrap())
}

/// 依次打开 `paths` 并堆叠为 (z, H, W) 数组. 所有切片必须同尺寸.
fn stack_planes<T, P>(paths: &[P]) -> LoadResult<Array3<T>>
where
    T: Copy + 'static,
    u8: AsPrimitive<T>,
    u16: AsPrimitive<T>,
    P: AsRef<Path>,
{
    let mut raw = Vec::new();
    let mut expected = None;
    for p in paths {
        let plane = read_plane::<T>(p.as_ref())?;
        let found = plane.dim();
        match expected {
            None => {
                raw.reserve(paths.len() * plane.len());
                expected = Some(found);
            }
            Some(expected) if expected != found => {
                return Err(LoadError::SliceShapeMismatch {
                    expected,
                    found,
                    path: p.as_ref().to_owned(),
                });
            }
            Some(_) => {}
        }
        raw.extend(plane.iter().copied());
    }

    let (h, w) = expected.ok_or(LoadError::EmptyStack)?;
    // 每张切片都已校验为 (h, w), 该操作不会生成 `Err`, 可直接 unwrap.
    Ok(Array3::from_shape_vec((paths.len(), h, w), raw).unwrap())
}
