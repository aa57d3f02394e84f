//! Machine-level behavior: reset, requests, snapshot determinism.

use renes::{Button, Cartridge, Nes, Request};

fn busy_nes() -> Nes {
    let mut nes = Nes::new(Cartridge::empty());
    // enable rendering and audio, then keep bumping a RAM counter and the
    // noise channel so that state keeps changing
    nes.load_program(
        0x0600,
        &[
            0xa9, 0x1e, // LDA #$1e
            0x8d, 0x01, 0x20, // STA $2001 (show bg + sprites)
            0xa9, 0x0f, // LDA #$0f
            0x8d, 0x15, 0x40, // STA $4015
            0xa9, 0x81, // LDA #$81
            0x8d, 0x0e, 0x40, // STA $400e
            0x8d, 0x0f, 0x40, // STA $400f
            0xee, 0x00, 0x03, // $0612, loop: INC $0300
            0xee, 0x11, 0x03, // INC $0311
            0x4c, 0x12, 0x06, // JMP loop
        ],
    );
    nes
}

#[test]
fn reset_restores_the_cpu_but_not_ram() {
    let mut nes = busy_nes();
    nes.run_cycles(10_000);
    let ram_counter = nes.bus().inspect(0x0300);
    assert_ne!(ram_counter, 0);

    nes.request(Request::Reset);
    nes.step(0.0001);

    assert_eq!(nes.cpu().pc(), 0x0600);
    assert_eq!(nes.cpu().sp(), 0xfd);
    assert_eq!(nes.cpu().status(), 0x24);
    // RAM survives the reset
    assert_eq!(nes.bus().inspect(0x0300), ram_counter);
}

#[test]
fn stop_request_latches_the_stopped_flag() {
    let mut nes = busy_nes();
    assert!(!nes.stopped());
    nes.request(Request::Stop);
    nes.step(0.0001);
    assert!(nes.stopped());
}

#[test]
fn controller_input_reaches_the_polling_program() {
    let mut nes = Nes::new(Cartridge::empty());
    // strobe, then shift all 8 bits of port 0 into $0280..$0287
    nes.load_program(
        0x0600,
        &[
            0xa9, 0x01, // LDA #$01
            0x8d, 0x16, 0x40, // STA $4016
            0xa9, 0x00, // LDA #$00
            0x8d, 0x16, 0x40, // STA $4016
            0xa2, 0x00, // LDX #$00
            0xad, 0x16, 0x40, // loop: LDA $4016
            0x9d, 0x80, 0x02, // STA $0280,X
            0xe8, // INX
            0xe0, 0x08, // CPX #$08
            0xd0, 0xf5, // BNE loop
            0x4c, 0x17, 0x06, // $0617: spin
        ],
    );
    nes.poke(0, Button::A, true);
    nes.poke(0, Button::Up, true);
    nes.run_cycles(500);

    let bits: Vec<u8> = (0..8).map(|i| nes.bus().inspect(0x0280 + i)).collect();
    assert_eq!(bits, vec![1, 0, 0, 0, 1, 0, 0, 0]);
}

#[test]
fn snapshot_round_trip_replays_identically() {
    let mut nes = busy_nes();
    nes.run_cycles(150_000); // past the first frame flip

    let mut snap = Vec::new();
    nes.save_snapshot(&mut snap).unwrap();

    let mut copy = Nes::new(Cartridge::empty());
    copy.load_snapshot(&snap[..]).unwrap();

    let rate = renes::CPU_FREQUENCY / 40.0;
    nes.set_sample_rate(rate);
    copy.set_sample_rate(rate);

    nes.run_cycles(120_000);
    copy.run_cycles(120_000);

    assert_eq!(nes.cpu().pc(), copy.cpu().pc());
    assert_eq!(nes.bus().inspect(0x0300), copy.bus().inspect(0x0300));
    assert_eq!(nes.framebuffer().front(), copy.framebuffer().front());

    let (a, b) = (nes.audio_queue(), copy.audio_queue());
    assert_eq!(a.len(), b.len());
    while let (Some(x), Some(y)) = (a.pop(), b.pop()) {
        assert_eq!(x, y);
    }
}

#[test]
fn snapshots_are_deterministic_bytes() {
    let mut nes = busy_nes();
    nes.run_cycles(50_000);

    let mut first = Vec::new();
    nes.save_snapshot(&mut first).unwrap();
    let mut second = Vec::new();
    nes.save_snapshot(&mut second).unwrap();
    assert_eq!(first, second);
}

#[test]
fn frames_keep_flipping_at_60hz() {
    let mut nes = busy_nes();
    // one NTSC frame is 341 * 262 / 3 cpu cycles
    nes.run_cycles(29_781);
    let frames = nes.framebuffer().frames();
    assert_eq!(frames, 1);
    assert!(nes.framebuffer_mut().take_frame().is_some());

    nes.run_cycles(29_781);
    assert_eq!(nes.framebuffer().frames(), 2);
}
