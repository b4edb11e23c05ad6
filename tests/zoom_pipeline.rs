use std::{
    collections::HashSet,
    path::{Path, PathBuf},
};

use image::{Rgba, RgbaImage};
use zoom_composer::{
    CancelToken, Dimension, Direction, Ease, EngineKind, FrameIndex, FrameSampler, JobSpec,
    PyramidConfig, Raster, Resampling, RgbaRaster, ZoomError, ZoomPyramid, run_job,
};

fn write_nested_images(dir: &Path, n: u8) -> Vec<PathBuf> {
    (0..n)
        .map(|i| {
            let path = dir.join(format!("level_{i}.png"));
            RgbaImage::from_fn(100, 100, |x, y| {
                Rgba([40 + i * 60, (x * 2) as u8, (y * 2) as u8, 255])
            })
            .save(&path)
            .unwrap();
            path
        })
        .collect()
}

fn scenario(tmp: &Path) -> JobSpec {
    JobSpec {
        images: write_nested_images(tmp, 3),
        zoom: 2.0,
        duration: 2.0,
        fps: 10,
        easing: "linear".to_owned(),
        direction: Direction::In,
        width: Dimension(1.0),
        height: Dimension(1.0),
        margin: Dimension(10.0),
        resampling: Resampling::Bilinear,
        threads: 3,
        tmp_dir: tmp.join("tmp"),
        skip_video_generation: true,
        ..JobSpec::default()
    }
}

fn frame_bytes(dir: &Path, range: std::ops::Range<u64>) -> Vec<Vec<u8>> {
    range
        .map(|i| std::fs::read(dir.join(FrameIndex(i).file_name())).unwrap())
        .collect()
}

#[test]
fn three_image_zoom_in_produces_expected_frames() {
    let tmp = tempfile::tempdir().unwrap();
    let spec = scenario(tmp.path());

    let out = run_job(&spec, &CancelToken::new()).unwrap();
    assert_eq!(out.frames_total, 20);
    assert_eq!(out.frames_rendered, 20);

    let pngs = std::fs::read_dir(&out.job_dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().is_some_and(|x| x == "png"))
        .count();
    assert_eq!(pngs, 20);

    let images: Vec<RgbaRaster> = spec
        .images
        .iter()
        .map(|p| RgbaRaster::load(p).unwrap())
        .collect();
    let pyramid = ZoomPyramid::build(
        images,
        &PyramidConfig {
            margin: 10,
            zoom: 2.0,
            filter: Resampling::Bilinear,
        },
    )
    .unwrap();

    let expected_first = pyramid
        .layer(0)
        .unwrap()
        .resize(100, 100, Resampling::Bilinear)
        .unwrap();
    let first = image::open(out.job_dir.join("000000.png"))
        .unwrap()
        .to_rgba8();
    assert_eq!(&first, expected_first.as_image());

    let sampler = FrameSampler::new(Ease::Linear, Direction::In, 2.0, 20, 2).unwrap();
    let last = sampler.sample(FrameIndex(19));
    assert_eq!(last.layer, pyramid.len() - 1);
    assert!((last.local_zoom - 1.0).abs() < 1e-9);
}

#[test]
fn resume_rebuilds_deleted_tail_identically() {
    let tmp = tempfile::tempdir().unwrap();
    let spec = scenario(tmp.path());

    let first = run_job(&spec, &CancelToken::new()).unwrap();
    let dir = first.job_dir.clone();
    let original = frame_bytes(&dir, 0..20);
    let head_mtimes: Vec<_> = (0..10)
        .map(|i| {
            std::fs::metadata(dir.join(FrameIndex(i).file_name()))
                .unwrap()
                .modified()
                .unwrap()
        })
        .collect();

    for i in 10..20 {
        std::fs::remove_file(dir.join(FrameIndex(i).file_name())).unwrap();
    }

    let second = run_job(&spec, &CancelToken::new()).unwrap();
    assert_eq!(second.job_dir, dir);
    assert_eq!(second.frames_resumed, 10);
    assert_eq!(second.frames_rendered, 10);
    assert_eq!(frame_bytes(&dir, 0..20), original);
    for (i, mtime) in head_mtimes.into_iter().enumerate() {
        let now = std::fs::metadata(dir.join(FrameIndex(i as u64).file_name()))
            .unwrap()
            .modified()
            .unwrap();
        assert_eq!(now, mtime, "frame {i} was rewritten");
    }
}

#[test]
fn gap_in_the_middle_truncates_the_resumable_prefix() {
    let tmp = tempfile::tempdir().unwrap();
    let spec = scenario(tmp.path());

    let first = run_job(&spec, &CancelToken::new()).unwrap();
    std::fs::remove_file(first.job_dir.join(FrameIndex(5).file_name())).unwrap();

    let second = run_job(&spec, &CancelToken::new()).unwrap();
    assert_eq!(second.frames_resumed, 5);
    assert_eq!(second.frames_rendered, 15);
}

#[test]
fn every_parameter_moves_the_frame_directory() {
    let tmp = tempfile::tempdir().unwrap();
    let base = JobSpec {
        inspect_blend: true,
        ..scenario(tmp.path())
    };

    let variants = vec![
        base.clone(),
        JobSpec {
            zoom: 3.0,
            ..base.clone()
        },
        JobSpec {
            duration: 3.0,
            ..base.clone()
        },
        JobSpec {
            fps: 12,
            ..base.clone()
        },
        JobSpec {
            easing: "easeInQuad".to_owned(),
            ..base.clone()
        },
        JobSpec {
            direction: Direction::Out,
            ..base.clone()
        },
        JobSpec {
            width: Dimension(0.5),
            ..base.clone()
        },
        JobSpec {
            height: Dimension(0.5),
            ..base.clone()
        },
        JobSpec {
            margin: Dimension(12.0),
            ..base.clone()
        },
        JobSpec {
            resampling: Resampling::Nearest,
            ..base.clone()
        },
        JobSpec {
            engine: EngineKind::Skia,
            ..base.clone()
        },
        JobSpec {
            reverse_images: true,
            ..base.clone()
        },
        JobSpec {
            images: base.images[..2].to_vec(),
            ..base.clone()
        },
    ];

    let dirs: HashSet<PathBuf> = variants
        .iter()
        .map(|spec| run_job(spec, &CancelToken::new()).unwrap().job_dir)
        .collect();
    assert_eq!(dirs.len(), variants.len());

    let again = run_job(&base, &CancelToken::new()).unwrap().job_dir;
    assert!(dirs.contains(&again));
}

#[test]
fn interrupted_job_keeps_no_partial_frames_and_resumes() {
    let tmp = tempfile::tempdir().unwrap();
    let spec = scenario(tmp.path());

    let cancel = CancelToken::new();
    cancel.cancel();
    let err = run_job(&spec, &cancel).unwrap_err();
    assert!(matches!(err, ZoomError::Interrupted));

    let out = run_job(&spec, &CancelToken::new()).unwrap();
    assert_eq!(out.frames_resumed, 0);
    assert_eq!(out.frames_rendered, 20);
    let leftovers = std::fs::read_dir(&out.job_dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().contains("partial"))
        .count();
    assert_eq!(leftovers, 0);
}

#[test]
fn blend_inspection_writes_trimmed_layers_only() {
    let tmp = tempfile::tempdir().unwrap();
    let spec = JobSpec {
        inspect_blend: true,
        ..scenario(tmp.path())
    };

    let out = run_job(&spec, &CancelToken::new()).unwrap();
    assert_eq!(out.blend_layers.len(), 3);
    assert_eq!(out.frames_rendered, 0);
    for path in &out.blend_layers {
        let img = image::open(path).unwrap();
        // Layers are 200px wide after alignment; 20px is trimmed from each edge.
        assert_eq!((img.width(), img.height()), (160, 160));
    }
    assert!(!out.job_dir.join(FrameIndex(0).file_name()).exists());
}

#[test]
fn unsupported_files_in_a_directory_are_skipped() {
    let tmp = tempfile::tempdir().unwrap();
    let images_dir = tmp.path().join("images");
    std::fs::create_dir_all(&images_dir).unwrap();
    write_nested_images(&images_dir, 2);
    std::fs::write(images_dir.join("notes.txt"), b"not an image").unwrap();

    let spec = JobSpec {
        images: vec![images_dir],
        ..scenario(tmp.path())
    };
    let out = run_job(&spec, &CancelToken::new()).unwrap();
    assert_eq!(out.frames_rendered, 20);
}

#[test]
fn a_single_usable_image_is_a_configuration_error() {
    let tmp = tempfile::tempdir().unwrap();
    let mut images = write_nested_images(tmp.path(), 1);
    let notes = tmp.path().join("notes.gif");
    std::fs::write(&notes, b"GIF89a").unwrap();
    images.push(notes);

    let spec = JobSpec {
        images,
        ..scenario(tmp.path())
    };
    let err = run_job(&spec, &CancelToken::new()).unwrap_err();
    assert!(err.is_configuration(), "{err}");
    assert!(!spec.tmp_dir.exists());
}
