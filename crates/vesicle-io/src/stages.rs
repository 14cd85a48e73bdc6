//! The four batch stages.
//!
//! Each stage lists its input, skips micrographs whose output already
//! exists (unless forced), applies the configured limit, and hands the
//! rest to [`run_batch`]. Stages communicate only through files laid
//! out by [`Layout`].

use image::ImageEncoder;
use vesicle_export::{render_preview, to_star};
use vesicle_pipeline::{
    PickMode, PickSet, PixelScale, filter_masks, find_masks, generate_picks, morphology, preprocess,
};

use crate::config::Config;
use crate::gate::{Gate, Gated};
use crate::layout::{Layout, Stage};
use crate::mrc::read_mrc_file;
use crate::run::{Outcome, RunError, RunOptions, StageError, StageReport, plan, run_batch};
use crate::store::{self, Compression, write_atomic};

fn listing_error(path: std::path::PathBuf) -> impl FnOnce(std::io::Error) -> RunError {
    move |source| RunError::Listing { path, source }
}

/// Stage 1: preprocess, segment and measure every new micrograph,
/// writing `masks/<mic>_mask.json`.
///
/// A micrograph with no detected masks gets no file.
///
/// # Errors
///
/// Returns [`RunError::Config`] for an unsupported segmentation backend
/// and [`RunError::Listing`] if the micrograph directory is unreadable.
pub fn run_find(config: &Config, opts: &RunOptions) -> Result<StageReport, RunError> {
    let backend = config.segmentation.build_generator()?;
    let layout = Layout::from_config(&config.io);
    let bases = layout
        .list_micrographs()
        .map_err(listing_error(layout.micrograph_dir().to_path_buf()))?;
    let (todo, skipped) = plan(bases, config.io.number_process, opts.force, |b| {
        layout.is_done(Stage::Masks, b)
    });

    let gate = Gate::new(config.segmentation.device_slots());
    let generator = Gated::new(&gate, &backend);

    run_batch("find", &todo, skipped, config.io.workers, &opts.cancel, |base| {
        let micrograph = read_mrc_file(&layout.micrograph_path(base))?;
        let image = preprocess(&micrograph, &config.preprocess)?;
        let masks = find_masks(&image, &generator, &config.statistics, config.scale)?;
        if masks.is_empty() {
            return Ok(Outcome::Empty);
        }
        store::save(
            &masks,
            &layout.staged_path(Stage::Masks, base),
            Compression::default(),
        )?;
        Ok(Outcome::Written)
    })
}

/// Stage 2: apply the `[filtering]` thresholds to every mask file,
/// writing `filter/<mic>_filter.json`.
///
/// A micrograph whose masks are all rejected gets no file.
///
/// # Errors
///
/// Returns [`RunError::Listing`] if the masks directory is unreadable.
pub fn run_filter(config: &Config, opts: &RunOptions) -> Result<StageReport, RunError> {
    let layout = Layout::from_config(&config.io);
    let bases = layout
        .list_stage(Stage::Masks)
        .map_err(listing_error(layout.stage_dir(Stage::Masks)))?;
    let (todo, skipped) = plan(bases, config.io.number_process, opts.force, |b| {
        layout.is_done(Stage::Filter, b)
    });

    run_batch("filter", &todo, skipped, config.io.workers, &opts.cancel, |base| {
        let masks = store::load(&layout.staged_path(Stage::Masks, base))?;
        let kept = filter_masks(masks, &config.thresholds);
        if kept.is_empty() {
            return Ok(Outcome::Empty);
        }
        store::save(
            &kept,
            &layout.staged_path(Stage::Filter, base),
            Compression::default(),
        )?;
        Ok(Outcome::Written)
    })
}

/// Stage 3: render previews for up to `limit` micrographs that have
/// masks, writing `display/<mic>_display.png`.
///
/// # Errors
///
/// Returns [`RunError::Listing`] if the masks directory is unreadable.
pub fn run_display(
    config: &Config,
    limit: Option<usize>,
    opts: &RunOptions,
) -> Result<StageReport, RunError> {
    let layout = Layout::from_config(&config.io);
    let bases = layout
        .list_stage(Stage::Masks)
        .map_err(listing_error(layout.stage_dir(Stage::Masks)))?;
    let (todo, skipped) = plan(bases, limit, opts.force, |b| {
        layout.is_done(Stage::Display, b)
    });

    run_batch("display", &todo, skipped, config.io.workers, &opts.cancel, |base| {
        let micrograph = read_mrc_file(&layout.micrograph_path(base))?;
        let image = preprocess(&micrograph, &config.preprocess)?;
        let detected = store::load(&layout.staged_path(Stage::Masks, base))?;
        let filter_path = layout.staged_path(Stage::Filter, base);
        let filtered = if filter_path.is_file() {
            Some(store::load(&filter_path)?)
        } else {
            None
        };

        let panel = render_preview(&image, &detected, filtered.as_deref());
        let mut png = Vec::new();
        image::codecs::png::PngEncoder::new(&mut png).write_image(
            panel.as_raw(),
            panel.width(),
            panel.height(),
            image::ExtendedColorType::Rgba8,
        )?;

        let path = layout.staged_path(Stage::Display, base);
        write_atomic(&path, &png).map_err(|source| StageError::Io { path, source })?;
        Ok(Outcome::Written)
    })
}

/// Stage 4: offset every filtered mask by the mode's dilation radius
/// and emit spaced picks, writing `picks_<mode>/<mic>_manualpick.star`.
///
/// Each micrograph's file is written as soon as its picks are computed.
/// Masks that erode away entirely leave the micrograph without a file;
/// surviving masks too small for a pick give a header-only file.
///
/// # Errors
///
/// Returns [`RunError::Config`] when `[picking] box_size` is missing and
/// [`RunError::Listing`] if the filter directory is unreadable.
pub fn run_picks(
    config: &Config,
    mode: PickMode,
    opts: &RunOptions,
) -> Result<StageReport, RunError> {
    let picking = config.require_picking()?;
    let radius = match mode {
        PickMode::Edge => picking.edge_dilation_radius,
        PickMode::Surface => picking.surface_dilation_radius,
    };
    let stage = Stage::Picks(mode);
    let layout = Layout::from_config(&config.io);
    let bases = layout
        .list_stage(Stage::Filter)
        .map_err(listing_error(layout.stage_dir(Stage::Filter)))?;
    let (todo, skipped) = plan(bases, config.io.number_process, opts.force, |b| {
        layout.is_done(stage, b)
    });
    log::info!(
        "picks: mode {mode}, box_size {} A, offset {radius} A",
        picking.box_size
    );

    run_batch("picks", &todo, skipped, config.io.workers, &opts.cancel, |base| {
        let masks = store::load(&layout.staged_path(Stage::Filter, base))?;
        let set = picks_for(base, masks, &config.scale, picking.box_size, radius, mode)?;
        let Some(set) = set else {
            return Ok(Outcome::Empty);
        };
        let path = layout.staged_path(stage, &set.micrograph);
        let star = to_star(&set);
        write_atomic(&path, star.as_bytes()).map_err(|source| StageError::Io { path, source })?;
        Ok(Outcome::Written)
    })
}

fn picks_for(
    base: &str,
    masks: Vec<vesicle_pipeline::MaskRecord>,
    scale: &PixelScale,
    box_size: f64,
    radius: f64,
    mode: PickMode,
) -> Result<Option<PickSet>, StageError> {
    let shaped = morphology::offset(masks, radius, scale);
    if shaped.is_empty() {
        return Ok(None);
    }
    let picks = generate_picks(&shaped, scale, box_size, mode)?;
    log::debug!("{base}: {} picks from {} masks", picks.len(), shaped.len());
    Ok(Some(PickSet {
        micrograph: base.to_string(),
        picks,
    }))
}
