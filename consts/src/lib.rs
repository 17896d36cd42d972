#![no_std]

/// Maximum Transfer Unit (MTU) size for BLE communication.
/// Set to 247 bytes to allow efficient data transfer while staying within BLE limits.
pub const ATT_MTU: usize = 247;

/// Full device name advertised over BLE.
/// Used as the default until a custom name is written over the air.
pub const DEVICE_NAME: &str = "SubG Bridge";

/// Short device name used in limited advertising data.
pub const SHORT_NAME: &str = "SubG";

/// UUID of the radio bridge service.
pub const BRIDGE_SERVICE_UUID: u128 = 0x0235733b_99c5_4197_b856_69219c2a3845;

/// List of BLE service UUIDs advertised by this device.
pub const SERVICES_LIST: [[u8; 16]; 1] = [BRIDGE_SERVICE_UUID.to_le_bytes()];

/// Maximum length accepted on the Data characteristic. Matches the radio
/// link frame limit so a single write maps to a single SPI transaction.
pub const DATA_CHAR_LEN: usize = 255;

/// Maximum length of the custom device name, in bytes.
pub const CUSTOM_NAME_MAX_LEN: usize = 100;

/// Maximum number of radio response frames buffered for the BLE side.
pub const RESPONSE_QUEUE_LEN: usize = 4;

/// Delay between asserting chip select and starting the size exchange.
/// The companion radio needs this long to arm its SPI slave DMA.
pub const PEER_SETUP_DELAY_US: u64 = 100;

/// Flash used by the S132 SoftDevice; the application image starts here.
pub const BASE_APP_ADDR: u32 = 0x0002_6000;

/// Total flash size of the nRF52832-xxAA.
pub const FLASH_SIZE: u32 = 0x0008_0000;

/// RAM reserved for the S132 SoftDevice with one peripheral connection
/// and a 247-byte ATT MTU (tuned from the SoftDevice RAM report at boot).
pub const SOFTDEVICE_RAM_RESERVED: u32 = 0x2AE8;

/// Total RAM size of the nRF52832-xxAA.
pub const RAM_SIZE: u32 = 0x0001_0000;

/// Flash page holding the persisted configuration record (last page).
pub const CONFIG_FLASH_ADDR: u32 = FLASH_SIZE - CONFIG_FLASH_PAGE_SIZE;

/// nRF52 flash page size.
pub const CONFIG_FLASH_PAGE_SIZE: u32 = 4096;

/// Size of the serialized configuration record, including its header.
/// Must be a multiple of the 4-byte flash write alignment.
pub const CONFIG_RECORD_LEN: usize = 128;

/// Marker identifying a valid configuration record.
pub const CONFIG_MAGIC: u32 = 0x5342_4746;
