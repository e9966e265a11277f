//! A raw GPU image handle.

use ash::vk;

use super::TextureFormat;

bitflags::bitflags! {
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
    pub struct ImageUsage: u32 {
        const SAMPLED = 0b0000_0001;
        const STORAGE = 0b0000_0010;
        const COLOR_ATTACHMENT = 0b0000_0100;
        const TRANSFER_DST = 0b0000_1000;
    }
}

#[derive(Debug)]
pub struct Image {
    pub handle: vk::Image,
    pub view: vk::ImageView,
    pub memory: vk::DeviceMemory,
    pub format: TextureFormat,
    pub width: u32,
    pub height: u32,
    pub usage: ImageUsage,
}

impl Image {
    pub fn null(format: TextureFormat, width: u32, height: u32, usage: ImageUsage) -> Self {
        Self {
            handle: vk::Image::null(),
            view: vk::ImageView::null(),
            memory: vk::DeviceMemory::null(),
            format,
            width,
            height,
            usage,
        }
    }

    pub fn is_null(&self) -> bool {
        self.handle == vk::Image::null()
    }
}
