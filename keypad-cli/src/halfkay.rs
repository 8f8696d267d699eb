//! Teensy 2.0 HalfKay bootloader client.
//!
//! HalfKay takes one HID SET_REPORT per flash page: a 2-byte little-endian
//! address followed by the page bytes. Writing to address 0xFFFF reboots
//! into the new firmware.

use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use rusb::{DeviceHandle, GlobalContext};
use std::time::Duration;

use crate::hex::FirmwareImage;

/// Teensy 2.0 HalfKay bootloader USB identifiers.
const HALFKAY_VID: u16 = 0x16C0;
const HALFKAY_PID: u16 = 0x0478;

/// ATmega32U4 flash page size in bytes.
const PAGE_SIZE: usize = 128;

/// Application flash available below the 512-byte bootloader.
const APP_FLASH_SIZE: u32 = 32768 - 512;

const USB_TIMEOUT: Duration = Duration::from_secs(2);

/// Time HalfKay needs to erase and program one page.
const PAGE_WRITE_DELAY: Duration = Duration::from_millis(5);

// HID SET_REPORT, class request to interface 0, output report 0.
const REQUEST_TYPE: u8 = 0x21;
const SET_REPORT: u8 = 0x09;
const OUTPUT_REPORT: u16 = 0x0200;

pub struct HalfKay {
    handle: DeviceHandle<GlobalContext>,
}

impl HalfKay {
    /// Whether a Teensy in bootloader mode is on the bus.
    pub fn detect() -> Result<bool> {
        Ok(find_device()?.is_some())
    }

    pub fn open() -> Result<Self> {
        let Some(device) = find_device()? else {
            bail!("Teensy bootloader not found. Press the reset button on the Teensy and try again.");
        };
        let handle = device
            .open()
            .context("failed to open Teensy bootloader (may need root/sudo or udev rules)")?;
        Ok(Self { handle })
    }

    /// Program `image` page by page, then reboot into it.
    pub fn flash(&self, image: &FirmwareImage) -> Result<()> {
        if image.end() > APP_FLASH_SIZE {
            bail!(
                "firmware too large: 0x{:04X}..0x{:04X} exceeds {} bytes of application flash",
                image.base,
                image.end(),
                APP_FLASH_SIZE
            );
        }

        let pages: Vec<(u32, &[u8])> = image.pages(PAGE_SIZE).collect();
        let pb = ProgressBar::new(pages.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{msg} [{bar:40.cyan/blue}] {pos}/{len} pages")
                .context("invalid progress template")?
                .progress_chars("=> "),
        );
        pb.set_message("Flashing");

        for (address, page) in pages {
            self.write_page(address, page)
                .with_context(|| format!("failed to write page at address 0x{:04X}", address))?;
            std::thread::sleep(PAGE_WRITE_DELAY);
            pb.inc(1);
        }
        pb.finish_with_message("Flashed");

        self.reboot();
        Ok(())
    }

    fn write_page(&self, address: u32, page: &[u8]) -> Result<()> {
        let mut buf = [0xFFu8; 2 + PAGE_SIZE];
        buf[..2].copy_from_slice(&(address as u16).to_le_bytes());
        buf[2..2 + page.len()].copy_from_slice(page);
        self.send(&buf).context("USB control transfer failed")?;
        Ok(())
    }

    fn reboot(&self) {
        let mut buf = [0u8; 2 + PAGE_SIZE];
        buf[0] = 0xFF;
        buf[1] = 0xFF;
        // The device drops off the bus mid-transfer, so the result is meaningless.
        let _ = self.send(&buf);
    }

    fn send(&self, buf: &[u8]) -> rusb::Result<usize> {
        self.handle
            .write_control(REQUEST_TYPE, SET_REPORT, OUTPUT_REPORT, 0, buf, USB_TIMEOUT)
    }
}

fn find_device() -> Result<Option<rusb::Device<GlobalContext>>> {
    let devices = rusb::devices().context("failed to enumerate USB devices")?;
    for device in devices.iter() {
        let desc = device
            .device_descriptor()
            .context("failed to read device descriptor")?;
        if desc.vendor_id() == HALFKAY_VID && desc.product_id() == HALFKAY_PID {
            return Ok(Some(device));
        }
    }
    Ok(None)
}
