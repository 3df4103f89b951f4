/*!
Arbitrary waveform upload.

Drives the binary handshake from [`feeltech_protocol::upload`] over the
transport. Any failure aborts the upload and leaves the slot contents
undefined; the only recovery is to run the whole upload again.
*/

use crate::error::Result;
use crate::transport::{Port, Transport};
use feeltech_protocol::upload::{
    clear_request, encode_sample, write_request, SAMPLE_ACK_LEN, STREAM_TERMINATOR,
};
use feeltech_protocol::{UploadStage, WaveformSlot};
use tracing::{debug, trace, warn};

/// Load `samples` into `slot`
pub(crate) fn upload_waveform<P: Port>(
    transport: &mut Transport<P>,
    slot: WaveformSlot,
    samples: &[u16],
) -> Result<()> {
    debug!(
        "Uploading {} samples to waveform slot {}",
        samples.len(),
        slot.index()
    );

    transport.wait_for_device();
    transport.discard_input()?;

    let mut stage = UploadStage::Clearing;
    while stage != UploadStage::Done {
        if let Err(e) = run_stage(transport, stage, slot, samples) {
            transport.mark_command_sent();
            warn!("Waveform upload to slot {} failed while {}: {}", slot.index(), stage, e);
            return Err(e);
        }
        stage = stage.next();
    }
    transport.mark_command_sent();

    debug!("Waveform slot {} written", slot.index());
    Ok(())
}

fn run_stage<P: Port>(
    transport: &mut Transport<P>,
    stage: UploadStage,
    slot: WaveformSlot,
    samples: &[u16],
) -> Result<()> {
    match stage {
        UploadStage::Clearing => {
            transport.write_exact(&clear_request(slot))?;
            expect_reply(transport, stage)
        }
        UploadStage::Opening => {
            transport.write_exact(&write_request(slot))?;
            expect_reply(transport, stage)
        }
        UploadStage::Streaming => {
            for (i, sample) in samples.iter().enumerate() {
                transport.write_exact(&encode_sample(*sample))?;
                let ack = transport.read_exact(SAMPLE_ACK_LEN)?;
                trace!("Sample {} = {} acknowledged with {:02X?}", i, sample, ack);
            }
            Ok(())
        }
        UploadStage::Finishing => {
            transport.write_exact(&[STREAM_TERMINATOR])?;
            expect_reply(transport, stage)
        }
        UploadStage::Done => Ok(()),
    }
}

fn expect_reply<P: Port>(transport: &mut Transport<P>, stage: UploadStage) -> Result<()> {
    let expected = stage.expected_reply();
    let reply = transport.read_exact(expected.len())?;
    stage.check_reply(&reply)?;
    Ok(())
}
