//! Ledger device model registry
//!
//! Static descriptions of supported hardware models, used for device
//! identification over USB and BLE. Lookups by BLE service UUID never fail,
//! unknown services resolve to [DEFAULT_BLE_MODEL].

use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

/// Ledger USB vendor id
pub const LEDGER_USB_VENDOR_ID: u16 = 0x2c97;

/// Model assumed for unrecognised BLE services
pub const DEFAULT_BLE_MODEL: DeviceModelId = DeviceModelId::NanoX;

/// Device model identifiers
#[derive(Copy, Clone, PartialEq, Eq, Debug, Display, EnumString, EnumIter)]
pub enum DeviceModelId {
    #[strum(serialize = "blue")]
    Blue,
    #[strum(serialize = "nanoS")]
    NanoS,
    #[strum(serialize = "nanoSP")]
    NanoSP,
    #[strum(serialize = "nanoX")]
    NanoX,
    #[strum(serialize = "stax")]
    Stax,
    #[strum(serialize = "europa")]
    Flex,
}

/// BLE GATT service description
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct BluetoothSpec {
    pub service_uuid: &'static str,
    pub notify_uuid: &'static str,
    pub write_uuid: &'static str,
    pub write_cmd_uuid: &'static str,
}

/// Device model description
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct DeviceModel {
    pub id: DeviceModelId,
    pub product_name: &'static str,
    /// Product id in the high byte of the USB product id (`0xMM..`)
    pub product_id_mm: u16,
    /// Legacy (pre-1.6 firmware) USB product id
    pub legacy_usb_product_id: u16,
    pub usb_only: bool,
    /// Flash size in bytes
    pub memory_size: usize,
    /// Flash block size in bytes
    pub block_size: usize,
    pub bluetooth: Option<BluetoothSpec>,
}

impl DeviceModelId {
    /// Fetch the model description
    pub fn model(&self) -> &'static DeviceModel {
        // Table order matches the enum
        &DEVICES[*self as usize]
    }
}

/// Supported device models
pub const DEVICES: &[DeviceModel] = &[
    DeviceModel {
        id: DeviceModelId::Blue,
        product_name: "Ledger Blue",
        product_id_mm: 0x00,
        legacy_usb_product_id: 0x0000,
        usb_only: true,
        memory_size: 480 * 1024,
        block_size: 4 * 1024,
        bluetooth: None,
    },
    DeviceModel {
        id: DeviceModelId::NanoS,
        product_name: "Ledger Nano S",
        product_id_mm: 0x10,
        legacy_usb_product_id: 0x0001,
        usb_only: true,
        memory_size: 320 * 1024,
        block_size: 4 * 1024,
        bluetooth: None,
    },
    DeviceModel {
        id: DeviceModelId::NanoSP,
        product_name: "Ledger Nano S Plus",
        product_id_mm: 0x50,
        legacy_usb_product_id: 0x0005,
        usb_only: true,
        memory_size: 1533 * 1024,
        block_size: 32,
        bluetooth: None,
    },
    DeviceModel {
        id: DeviceModelId::NanoX,
        product_name: "Ledger Nano X",
        product_id_mm: 0x40,
        legacy_usb_product_id: 0x0004,
        usb_only: false,
        memory_size: 2 * 1024 * 1024,
        block_size: 4 * 1024,
        bluetooth: Some(BluetoothSpec {
            service_uuid: "13d63400-2c97-0004-0000-4c6564676572",
            notify_uuid: "13d63400-2c97-0004-0001-4c6564676572",
            write_uuid: "13d63400-2c97-0004-0002-4c6564676572",
            write_cmd_uuid: "13d63400-2c97-0004-0003-4c6564676572",
        }),
    },
    DeviceModel {
        id: DeviceModelId::Stax,
        product_name: "Ledger Stax",
        product_id_mm: 0x60,
        legacy_usb_product_id: 0x0006,
        usb_only: false,
        memory_size: 1533 * 1024,
        block_size: 32,
        bluetooth: Some(BluetoothSpec {
            service_uuid: "13d63400-2c97-6004-0000-4c6564676572",
            notify_uuid: "13d63400-2c97-6004-0001-4c6564676572",
            write_uuid: "13d63400-2c97-6004-0002-4c6564676572",
            write_cmd_uuid: "13d63400-2c97-6004-0003-4c6564676572",
        }),
    },
    DeviceModel {
        id: DeviceModelId::Flex,
        product_name: "Ledger Flex",
        product_id_mm: 0x70,
        legacy_usb_product_id: 0x0007,
        usb_only: false,
        memory_size: 1533 * 1024,
        block_size: 32,
        bluetooth: Some(BluetoothSpec {
            service_uuid: "13d63400-2c97-3004-0000-4c6564676572",
            notify_uuid: "13d63400-2c97-3004-0001-4c6564676572",
            write_uuid: "13d63400-2c97-3004-0002-4c6564676572",
            write_cmd_uuid: "13d63400-2c97-3004-0003-4c6564676572",
        }),
    },
];

/// Lookup a model by id
pub fn by_id(id: DeviceModelId) -> &'static DeviceModel {
    id.model()
}

/// Lookup a model by USB product id, matching either the legacy product id
/// or the model byte of current product ids
pub fn by_usb_product_id(product_id: u16) -> Option<&'static DeviceModel> {
    DEVICES
        .iter()
        .find(|d| d.legacy_usb_product_id == product_id)
        .or_else(|| {
            DEVICES
                .iter()
                .find(|d| d.product_id_mm == product_id >> 8)
        })
}

/// Lookup a model by BLE service UUID (case-insensitive), falling back to
/// [DEFAULT_BLE_MODEL] for unknown services
pub fn by_service_uuid(uuid: &str) -> &'static DeviceModel {
    DEVICES
        .iter()
        .find(|d| match &d.bluetooth {
            Some(b) => b.service_uuid.eq_ignore_ascii_case(uuid),
            None => false,
        })
        .unwrap_or(DEFAULT_BLE_MODEL.model())
}

/// BLE service UUIDs for all BLE-capable models
pub fn ble_service_uuids() -> Vec<&'static str> {
    DeviceModelId::iter()
        .filter_map(|id| id.model().bluetooth.map(|b| b.service_uuid))
        .collect()
}

#[cfg(test)]
mod test {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn table_order() {
        for id in DeviceModelId::iter() {
            assert_eq!(by_id(id).id, id);
        }
        assert_eq!(DEVICES.len(), DeviceModelId::iter().count());
    }

    #[test]
    fn model_names() {
        assert_eq!(DeviceModelId::NanoSP.to_string(), "nanoSP");
        assert_eq!(DeviceModelId::from_str("europa"), Ok(DeviceModelId::Flex));
        assert_eq!(by_id(DeviceModelId::Flex).product_name, "Ledger Flex");
    }

    #[test]
    fn usb_lookup() {
        let id = |pid| by_usb_product_id(pid).map(|d| d.id);

        // Legacy product ids
        assert_eq!(id(0x0001), Some(DeviceModelId::NanoS));
        assert_eq!(id(0x0004), Some(DeviceModelId::NanoX));

        // Model byte with interface flags
        assert_eq!(id(0x4011), Some(DeviceModelId::NanoX));
        assert_eq!(id(0x5015), Some(DeviceModelId::NanoSP));
        assert_eq!(id(0x6001), Some(DeviceModelId::Stax));

        assert_eq!(id(0xff00), None);
    }

    #[test]
    fn ble_lookup() {
        assert_eq!(
            by_service_uuid("13D63400-2C97-6004-0000-4C6564676572").id,
            DeviceModelId::Stax
        );
        assert_eq!(
            by_service_uuid("13d63400-2c97-3004-0000-4c6564676572").id,
            DeviceModelId::Flex
        );

        // Unknown services resolve to the default model
        assert_eq!(by_service_uuid("not-a-uuid").id, DEFAULT_BLE_MODEL);

        assert_eq!(ble_service_uuids().len(), 3);
    }
}
