use wispmon_core::protocol::{
    Command, CommandBuilder, EndOfInput, MemoryChannel, PacketReader, ProtocolError, RawPacket,
    Response,
};

#[test]
fn test_time_payload_is_little_endian_u32() {
    for cycles in [0u32, 1, 0xFF, 0x100, 0x00AB_CDEF, 0x8000_0000, u32::MAX] {
        let packet = RawPacket::new(Response::Time.code(), cycles.to_le_bytes().to_vec());
        assert_eq!(packet.time_cycles().unwrap(), cycles);
    }
}

#[test]
fn test_vcap_payload_is_little_endian_u16() {
    let packet = RawPacket::new(Response::Vcap.code(), vec![0x34, 0x0A]);
    assert_eq!(packet.adc_code().unwrap(), 0x0A34);
}

#[test]
fn test_wrong_payload_size() {
    let packet = RawPacket::new(Response::Vcap.code(), vec![0x01]);
    assert!(matches!(
        packet.adc_code(),
        Err(ProtocolError::PayloadLength {
            descriptor: 0x00,
            expected: 2,
            actual: 1
        })
    ));
}

#[test]
fn test_reader_frames_regardless_of_chunking() {
    let mut stream = Vec::new();
    for i in 0..50u32 {
        stream.extend(RawPacket::new(Response::Time.code(), (i * 1000).to_le_bytes().to_vec()).to_bytes());
        stream.extend(RawPacket::new(Response::Vcap.code(), (i as u16).to_le_bytes().to_vec()).to_bytes());
    }

    for chunk_size in [1, 2, 5, 7, 64, 1000] {
        let channel = MemoryChannel::from_bytes(&stream, chunk_size, EndOfInput::Closed);
        let mut reader = PacketReader::new(channel);
        let mut packets = Vec::new();
        loop {
            match reader.poll() {
                Ok(_) => {}
                Err(ProtocolError::ChannelClosed) => break,
                Err(e) => panic!("unexpected error: {}", e),
            }
            while let Some(packet) = reader.next_packet() {
                packets.push(packet);
            }
        }

        assert_eq!(packets.len(), 100, "chunk size {}", chunk_size);
        for (i, pair) in packets.chunks(2).enumerate() {
            assert_eq!(pair[0].time_cycles().unwrap(), i as u32 * 1000);
            assert_eq!(pair[1].adc_code().unwrap(), i as u16);
        }
        assert_eq!(reader.framer().dropped_bytes(), 0);
    }
}

#[test]
fn test_command_frames() {
    assert_eq!(
        CommandBuilder::new(Command::LogVcapBegin).build().unwrap(),
        vec![0xF0, 0x0D]
    );
    assert_eq!(
        CommandBuilder::new(Command::SetPwmFrequency)
            .u16_le(512)
            .build()
            .unwrap(),
        vec![0xF0, 0x20, 0x02, 0x00, 0x02]
    );
}

#[test]
fn test_protocol_error_display() {
    let err = ProtocolError::ChannelClosed;
    assert_eq!(err.to_string(), "Channel closed by peer");

    let err = ProtocolError::PayloadLength {
        descriptor: 0x0D,
        expected: 4,
        actual: 3,
    };
    assert_eq!(
        err.to_string(),
        "Malformed 0x0d packet: expected 4 payload bytes, got 3"
    );
}
