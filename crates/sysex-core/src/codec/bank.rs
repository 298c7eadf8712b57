use log::debug;

use super::{MemoryKind, RolandCodec};
use crate::address::number_to_size;
use crate::capability::BankDumpCapable;
use crate::dataset::Dataset;
use crate::reassembler::BulkReassembler;
use crate::session::DeviceSession;
use crate::wire::{AddressedMessage, CM_ID_DT1};
use crate::CodecError;

impl RolandCodec {
    /// Reassembles bank fragments against the program dataset.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::NoProgramMemory`] for edit-buffer-only devices.
    pub fn reassemble(&self, messages: &[Vec<u8>]) -> Result<BulkReassembler<'_>, CodecError> {
        let dataset = self.dataset(MemoryKind::Program)?;
        let mut reassembler = BulkReassembler::new(&self.framing, dataset);
        reassembler.absorb_all(messages);
        Ok(reassembler)
    }
}

impl BankDumpCapable for RolandCodec {
    fn build_bank_dump_request(&self, session: &DeviceSession) -> Result<Vec<u8>, CodecError> {
        let dataset = self.dataset(MemoryKind::Program)?;
        let size = number_to_size(dataset.span(), dataset.size_width())?;
        Ok(self.framing.encode(&AddressedMessage::request(
            session.device_id(),
            dataset.base_address(),
            size,
        )))
    }

    fn is_part_of_bank_dump(&self, message: &[u8]) -> bool {
        let Ok(dataset) = self.dataset(MemoryKind::Program) else {
            return false;
        };
        self.framing
            .decode(message)
            .is_ok_and(|decoded| decoded.command == CM_ID_DT1 && dataset.contains(&decoded.address))
    }

    fn is_bank_dump_finished(&self, messages: &[Vec<u8>]) -> bool {
        self.reassemble(messages)
            .is_ok_and(|reassembler| reassembler.is_complete())
    }

    fn extract_items_from_bank(&self, messages: &[Vec<u8>]) -> Vec<Vec<u8>> {
        let Ok(reassembler) = self.reassemble(messages) else {
            return Vec::new();
        };
        let device_id = reassembler.device_id().unwrap_or(self.device_id_base);
        let count = self.program.as_ref().map_or(0, Dataset::item_count);
        (0..count)
            .filter_map(|index| {
                let payload = reassembler.item_payload(index)?;
                self.emit_item(MemoryKind::Program, index, device_id, &payload)
                    .inspect_err(|err| debug!("{}: skipping item {index}: {err}", self.model_name))
                    .ok()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use crate::capability::{BankDumpCapable, ProgramDumpCapable};
    use crate::{
        Address, AddressWidth, AddressedMessage, Channel, DatasetSpec, DeviceIdentity,
        DeviceSpec, RolandCodec,
    };

    fn codec() -> RolandCodec {
        DeviceSpec::new(
            "Bank synth",
            DeviceIdentity::roland(&[0x6A], Some([0x6A, 0x00])),
            AddressWidth::Four,
            DatasetSpec::new("Temporary", AddressWidth::Four)
                .base_address(&[0x03, 0x00, 0x00, 0x00])
                .block(&[0, 0, 0, 0], 0x08, "Common"),
        )
        .program_dump(
            DatasetSpec::new("User", AddressWidth::Four)
                .base_address(&[0x11, 0x00, 0x00, 0x00])
                .items(4)
                .block(&[0, 0, 0, 0], 0x08, "Common"),
        )
        .build()
        .expect("valid")
    }

    fn fragment(codec: &RolandCodec, offset: u32, payload: Vec<u8>) -> Vec<u8> {
        let base = codec.program().expect("program").base_address();
        let address = base.offset_by(offset).expect("fits");
        codec
            .framing()
            .encode(&AddressedMessage::data_set(0x12, address, payload))
    }

    #[test]
    fn bank_request_covers_the_whole_span() {
        let codec = codec();
        let request = codec
            .build_bank_dump_request(&codec.session(Channel::new(0).expect("valid")))
            .expect("fits");
        assert_eq!(&request[5..9], &[0x11, 0x00, 0x00, 0x00]);
        assert_eq!(&request[9..13], &[0x00, 0x00, 0x00, 0x20]);
    }

    #[test]
    fn partial_bank_yields_complete_items_only() {
        let codec = codec();
        let messages = vec![
            fragment(&codec, 0, vec![0x01; 0x0C]),
            fragment(&codec, 0x18, vec![0x04; 0x08]),
        ];
        assert!(messages.iter().all(|m| codec.is_part_of_bank_dump(m)));
        assert!(!codec.is_bank_dump_finished(&messages));

        let items = codec.extract_items_from_bank(&messages);
        assert_eq!(items.len(), 2);
        assert_eq!(codec.program_index(&items[0]), Some(0));
        assert_eq!(codec.program_index(&items[1]), Some(3));
        assert_eq!(items[1][2], 0x12);
    }

    #[test]
    fn edit_buffer_messages_are_not_bank_fragments() {
        let codec = codec();
        let address = Address::from_slice(&[0x03, 0x00, 0x00, 0x00]).expect("valid");
        let edit = codec
            .framing()
            .encode(&AddressedMessage::data_set(0x10, address, vec![0; 8]));
        assert!(!codec.is_part_of_bank_dump(&edit));
    }

    #[test]
    fn complete_bank_is_finished() {
        let codec = codec();
        let messages = vec![
            fragment(&codec, 0x10, vec![0x02; 0x10]),
            fragment(&codec, 0, vec![0x01; 0x10]),
        ];
        assert!(codec.is_bank_dump_finished(&messages));
        assert_eq!(codec.extract_items_from_bank(&messages).len(), 4);
    }
}
