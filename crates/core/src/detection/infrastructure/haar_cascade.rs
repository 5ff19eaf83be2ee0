use std::path::{Path, PathBuf};
use std::str::FromStr;

use roxmltree::Node;
use thiserror::Error;

use super::integral_image::IntegralImage;

/// Subtracted from every stage threshold, matching how trained cascades are
/// meant to be evaluated.
const STAGE_THRESHOLD_EPS: f32 = 1e-5;

#[derive(Error, Debug)]
pub enum CascadeError {
    #[error("failed to read cascade {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed cascade XML: {0}")]
    Xml(#[from] roxmltree::Error),
    #[error("cascade is missing <{0}>")]
    MissingElement(&'static str),
    #[error("invalid value in <{element}>: {value:?}")]
    InvalidValue { element: &'static str, value: String },
    #[error("unsupported cascade: {0}")]
    Unsupported(String),
    #[error("inconsistent cascade: {0}")]
    Inconsistent(String),
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct WeightedRect {
    x: u32,
    y: u32,
    width: u32,
    height: u32,
    weight: f32,
}

#[derive(Debug, Clone, PartialEq)]
struct Feature {
    rects: Vec<WeightedRect>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct TreeNode {
    feature: usize,
    threshold: f32,
    // Positive values index another node, zero or negative values index a leaf.
    left: i32,
    right: i32,
}

#[derive(Debug, Clone, PartialEq)]
struct Tree {
    nodes: Vec<TreeNode>,
    leaves: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq)]
struct Stage {
    threshold: f32,
    trees: Vec<Tree>,
}

/// A boosted cascade of Haar-feature decision trees.
///
/// Loaded from the XML format produced by `opencv_traincascade`. Only the
/// upright (non-tilted) Haar feature set is supported.
#[derive(Debug, Clone, PartialEq)]
pub struct HaarCascade {
    window_width: u32,
    window_height: u32,
    stages: Vec<Stage>,
    features: Vec<Feature>,
}

impl HaarCascade {
    pub fn load(path: &Path) -> Result<Self, CascadeError> {
        let text = std::fs::read_to_string(path).map_err(|source| CascadeError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let cascade = Self::parse(&text)?;
        log::info!(
            "Loaded cascade {} ({} stages, {}x{} window)",
            path.display(),
            cascade.stages.len(),
            cascade.window_width,
            cascade.window_height
        );
        Ok(cascade)
    }

    pub fn parse(xml: &str) -> Result<Self, CascadeError> {
        let doc = roxmltree::Document::parse(xml)?;
        let root = doc
            .root_element()
            .first_element_child()
            .ok_or(CascadeError::MissingElement("cascade"))?;

        if root.attribute("type_id") == Some("opencv-haar-classifier") {
            return Err(CascadeError::Unsupported(
                "legacy haar classifier format".to_string(),
            ));
        }

        let stage_type = text_of(root, "stageType")?;
        if stage_type.trim() != "BOOST" {
            return Err(CascadeError::Unsupported(format!(
                "stage type {}",
                stage_type.trim()
            )));
        }
        let feature_type = text_of(root, "featureType")?;
        if feature_type.trim() != "HAAR" {
            return Err(CascadeError::Unsupported(format!(
                "feature type {}",
                feature_type.trim()
            )));
        }
        if let Some(params) = child(root, "featureParams") {
            if let Some(max_cat) = child(params, "maxCatCount") {
                let max_cat: u32 = parse_value("maxCatCount", max_cat.text().unwrap_or(""))?;
                if max_cat != 0 {
                    return Err(CascadeError::Unsupported(
                        "categorical features".to_string(),
                    ));
                }
            }
        }

        let window_width: u32 = parse_value("width", text_of(root, "width")?)?;
        let window_height: u32 = parse_value("height", text_of(root, "height")?)?;
        if window_width < 3 || window_height < 3 {
            return Err(CascadeError::Inconsistent(format!(
                "window {window_width}x{window_height} is too small"
            )));
        }

        let features = items(require(root, "features")?)
            .map(parse_feature)
            .collect::<Result<Vec<_>, _>>()?;
        let stages = items(require(root, "stages")?)
            .map(parse_stage)
            .collect::<Result<Vec<_>, _>>()?;

        let cascade = Self {
            window_width,
            window_height,
            stages,
            features,
        };
        cascade.validate()?;
        Ok(cascade)
    }

    pub fn window_width(&self) -> u32 {
        self.window_width
    }

    pub fn window_height(&self) -> u32 {
        self.window_height
    }

    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Runs the window whose top-left corner is `(x, y)` through every stage.
    ///
    /// The window must lie inside the integral image.
    pub fn passes(&self, ii: &IntegralImage, x: u32, y: u32) -> bool {
        self.rejecting_stage(ii, x, y).is_none()
    }

    /// Index of the first stage that rejects the window, or `None` when all
    /// of them accept it.
    pub fn rejecting_stage(&self, ii: &IntegralImage, x: u32, y: u32) -> Option<usize> {
        let inv_norm = self.inverse_norm(ii, x, y);

        self.stages.iter().position(|stage| {
            let sum: f32 = stage
                .trees
                .iter()
                .map(|tree| self.predict(tree, ii, x, y, inv_norm))
                .sum();
            sum < stage.threshold
        })
    }

    /// Reciprocal of the window's contrast, measured on the window shrunk by
    /// one pixel on each side.
    fn inverse_norm(&self, ii: &IntegralImage, x: u32, y: u32) -> f32 {
        let (w, h) = (self.window_width - 2, self.window_height - 2);
        let area = (w * h) as u64;
        let sum = ii.rect_sum(x + 1, y + 1, w, h);
        let square_sum = ii.rect_square_sum(x + 1, y + 1, w, h);

        let nf = (area * square_sum).saturating_sub(sum * sum) as f64;
        let nf = if nf > 0.0 { nf.sqrt() } else { 1.0 };
        (1.0 / nf) as f32
    }

    fn predict(&self, tree: &Tree, ii: &IntegralImage, x: u32, y: u32, inv_norm: f32) -> f32 {
        let mut idx = 0i32;
        loop {
            let node = &tree.nodes[idx as usize];
            let value = self.feature_value(node.feature, ii, x, y) * inv_norm;
            idx = if value < node.threshold {
                node.left
            } else {
                node.right
            };
            if idx <= 0 {
                return tree.leaves[(-idx) as usize];
            }
        }
    }

    fn feature_value(&self, feature: usize, ii: &IntegralImage, x: u32, y: u32) -> f32 {
        self.features[feature]
            .rects
            .iter()
            .map(|r| r.weight * ii.rect_sum(x + r.x, y + r.y, r.width, r.height) as f32)
            .sum()
    }

    fn validate(&self) -> Result<(), CascadeError> {
        if self.stages.is_empty() {
            return Err(CascadeError::Inconsistent("no stages".to_string()));
        }

        for (i, feature) in self.features.iter().enumerate() {
            for r in &feature.rects {
                if r.x + r.width > self.window_width || r.y + r.height > self.window_height {
                    return Err(CascadeError::Inconsistent(format!(
                        "feature {i} extends past the detection window"
                    )));
                }
            }
        }

        for (s, stage) in self.stages.iter().enumerate() {
            for tree in &stage.trees {
                if tree.nodes.is_empty() {
                    return Err(CascadeError::Inconsistent(format!(
                        "stage {s} has a tree without nodes"
                    )));
                }
                for (n, node) in tree.nodes.iter().enumerate() {
                    if node.feature >= self.features.len() {
                        return Err(CascadeError::Inconsistent(format!(
                            "stage {s} references missing feature {}",
                            node.feature
                        )));
                    }
                    for next in [node.left, node.right] {
                        // Children must point forward so evaluation terminates.
                        let valid = if next > 0 {
                            (next as usize) > n && (next as usize) < tree.nodes.len()
                        } else {
                            ((-next) as usize) < tree.leaves.len()
                        };
                        if !valid {
                            return Err(CascadeError::Inconsistent(format!(
                                "stage {s} has a tree with invalid child index {next}"
                            )));
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

fn child<'a, 'i>(node: Node<'a, 'i>, name: &str) -> Option<Node<'a, 'i>> {
    node.children()
        .find(|c| c.is_element() && c.tag_name().name() == name)
}

fn require<'a, 'i>(node: Node<'a, 'i>, name: &'static str) -> Result<Node<'a, 'i>, CascadeError> {
    child(node, name).ok_or(CascadeError::MissingElement(name))
}

fn text_of<'a>(node: Node<'a, '_>, name: &'static str) -> Result<&'a str, CascadeError> {
    require(node, name).map(|n| n.text().unwrap_or(""))
}

/// Sequence entries, which the storage format writes as `<_>` elements.
fn items<'a, 'i>(node: Node<'a, 'i>) -> impl Iterator<Item = Node<'a, 'i>> {
    node.children()
        .filter(|c| c.is_element() && c.tag_name().name() == "_")
}

fn parse_value<T: FromStr>(element: &'static str, text: &str) -> Result<T, CascadeError> {
    text.trim()
        .parse()
        .map_err(|_| CascadeError::InvalidValue {
            element,
            value: text.trim().to_string(),
        })
}

fn parse_list<T: FromStr>(element: &'static str, text: &str) -> Result<Vec<T>, CascadeError> {
    text.split_whitespace()
        .map(|token| parse_value(element, token))
        .collect()
}

fn parse_feature(node: Node) -> Result<Feature, CascadeError> {
    if let Some(tilted) = child(node, "tilted") {
        let tilted: i32 = parse_value("tilted", tilted.text().unwrap_or(""))?;
        if tilted != 0 {
            return Err(CascadeError::Unsupported("tilted features".to_string()));
        }
    }

    let rects = items(require(node, "rects")?)
        .map(|rect| {
            let values: Vec<f32> = parse_list("rects", rect.text().unwrap_or(""))?;
            let [x, y, width, height, weight] = values[..] else {
                return Err(CascadeError::InvalidValue {
                    element: "rects",
                    value: rect.text().unwrap_or("").trim().to_string(),
                });
            };
            if x < 0.0 || y < 0.0 || width < 0.0 || height < 0.0 {
                return Err(CascadeError::InvalidValue {
                    element: "rects",
                    value: rect.text().unwrap_or("").trim().to_string(),
                });
            }
            Ok(WeightedRect {
                x: x as u32,
                y: y as u32,
                width: width as u32,
                height: height as u32,
                weight,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Feature { rects })
}

fn parse_stage(node: Node) -> Result<Stage, CascadeError> {
    let threshold: f32 = parse_value("stageThreshold", text_of(node, "stageThreshold")?)?;
    let trees = items(require(node, "weakClassifiers")?)
        .map(parse_tree)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Stage {
        threshold: threshold - STAGE_THRESHOLD_EPS,
        trees,
    })
}

fn parse_tree(node: Node) -> Result<Tree, CascadeError> {
    let raw: Vec<f64> = parse_list("internalNodes", text_of(node, "internalNodes")?)?;
    if raw.len() % 4 != 0 {
        return Err(CascadeError::InvalidValue {
            element: "internalNodes",
            value: format!("{} values", raw.len()),
        });
    }
    let leaves: Vec<f32> = parse_list("leafValues", text_of(node, "leafValues")?)?;

    let nodes = raw
        .chunks_exact(4)
        .map(|chunk| {
            let (left, right, feature, threshold) = (chunk[0], chunk[1], chunk[2], chunk[3]);
            if feature < 0.0 {
                return Err(CascadeError::InvalidValue {
                    element: "internalNodes",
                    value: feature.to_string(),
                });
            }
            Ok(TreeNode {
                feature: feature as usize,
                threshold: threshold as f32,
                left: left as i32,
                right: right as i32,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Tree { nodes, leaves })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    /// A 6x6 single-stage cascade that fires on windows whose centre is
    /// brighter than their surroundings.
    pub(crate) const BRIGHT_CENTRE_CASCADE: &str = r#"<?xml version="1.0"?>
<opencv_storage>
<cascade>
  <stageType>BOOST</stageType>
  <featureType>HAAR</featureType>
  <height>6</height>
  <width>6</width>
  <stageParams><maxWeakCount>1</maxWeakCount></stageParams>
  <featureParams><maxCatCount>0</maxCatCount></featureParams>
  <stageNum>1</stageNum>
  <stages>
    <_>
      <maxWeakCount>1</maxWeakCount>
      <stageThreshold>0.</stageThreshold>
      <weakClassifiers>
        <_>
          <internalNodes>0 -1 0 5.0000000000000000e-01</internalNodes>
          <leafValues>-1. 1.</leafValues></_></weakClassifiers></_></stages>
  <features>
    <_>
      <rects>
        <_>1 1 4 4 -1.</_>
        <_>2 2 2 2 4.</_></rects></_></features></cascade>
</opencv_storage>
"#;

    fn cascade_with(stages: &str, features: &str) -> String {
        format!(
            "<opencv_storage><cascade><stageType>BOOST</stageType>\
             <featureType>HAAR</featureType><height>6</height><width>6</width>\
             <stages>{stages}</stages><features>{features}</features>\
             </cascade></opencv_storage>"
        )
    }

    const ONE_FEATURE: &str = "<_><rects><_>1 1 4 4 -1.</_><_>2 2 2 2 4.</_></rects></_>";

    fn image_with_square(size: u32, at: u32, side: u32) -> GrayImage {
        GrayImage::from_fn(size, size, |x, y| {
            let inside = (at..at + side).contains(&x) && (at..at + side).contains(&y);
            Luma([if inside { 255 } else { 0 }])
        })
    }

    #[test]
    fn test_parse_reads_window_and_stages() {
        let cascade = HaarCascade::parse(BRIGHT_CENTRE_CASCADE).unwrap();
        assert_eq!(cascade.window_width(), 6);
        assert_eq!(cascade.window_height(), 6);
        assert_eq!(cascade.stage_count(), 1);
        assert_eq!(cascade.features[0].rects.len(), 2);
        assert_eq!(cascade.stages[0].trees[0].nodes[0].left, 0);
        assert_eq!(cascade.stages[0].trees[0].nodes[0].right, -1);
    }

    #[test]
    fn test_stage_threshold_is_relaxed() {
        let cascade = HaarCascade::parse(BRIGHT_CENTRE_CASCADE).unwrap();
        approx::assert_relative_eq!(cascade.stages[0].threshold, -STAGE_THRESHOLD_EPS);
    }

    #[test]
    fn test_window_with_bright_centre_passes() {
        let cascade = HaarCascade::parse(BRIGHT_CENTRE_CASCADE).unwrap();
        let ii = IntegralImage::new(&image_with_square(48, 20, 8));
        assert!(cascade.passes(&ii, 18, 20));
    }

    #[test]
    fn test_flat_windows_are_rejected() {
        let cascade = HaarCascade::parse(BRIGHT_CENTRE_CASCADE).unwrap();
        let ii = IntegralImage::new(&image_with_square(48, 20, 8));
        // All black, then entirely inside the white square.
        assert!(!cascade.passes(&ii, 0, 0));
        assert!(!cascade.passes(&ii, 21, 21));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = HaarCascade::load(&dir.path().join("absent.xml")).unwrap_err();
        assert!(matches!(err, CascadeError::Io { .. }));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cascade.xml");
        std::fs::write(&path, BRIGHT_CENTRE_CASCADE).unwrap();
        let cascade = HaarCascade::load(&path).unwrap();
        assert_eq!(cascade.stage_count(), 1);
    }

    #[test]
    fn test_malformed_xml_is_rejected() {
        let err = HaarCascade::parse("<opencv_storage><cascade>").unwrap_err();
        assert!(matches!(err, CascadeError::Xml(_)));
    }

    #[test]
    fn test_legacy_format_is_unsupported() {
        let xml = r#"<opencv_storage><face type_id="opencv-haar-classifier"><size>24 24</size></face></opencv_storage>"#;
        let err = HaarCascade::parse(xml).unwrap_err();
        assert!(matches!(err, CascadeError::Unsupported(_)));
    }

    #[test]
    fn test_lbp_cascade_is_unsupported() {
        let xml = cascade_with("", ONE_FEATURE).replace("HAAR", "LBP");
        let err = HaarCascade::parse(&xml).unwrap_err();
        assert!(matches!(err, CascadeError::Unsupported(_)));
    }

    #[test]
    fn test_tilted_feature_is_unsupported() {
        let stage = "<_><stageThreshold>0</stageThreshold><weakClassifiers><_>\
                     <internalNodes>0 -1 0 0.5</internalNodes><leafValues>-1 1</leafValues>\
                     </_></weakClassifiers></_>";
        let feature = "<_><rects><_>1 1 4 4 -1.</_></rects><tilted>1</tilted></_>";
        let err = HaarCascade::parse(&cascade_with(stage, feature)).unwrap_err();
        assert!(matches!(err, CascadeError::Unsupported(_)));
    }

    #[test]
    fn test_missing_stages_element() {
        let xml = "<opencv_storage><cascade><stageType>BOOST</stageType>\
                   <featureType>HAAR</featureType><height>6</height><width>6</width>\
                   <features></features></cascade></opencv_storage>";
        let err = HaarCascade::parse(xml).unwrap_err();
        assert!(matches!(err, CascadeError::MissingElement("stages")));
    }

    #[test]
    fn test_empty_cascade_is_inconsistent() {
        let err = HaarCascade::parse(&cascade_with("", ONE_FEATURE)).unwrap_err();
        assert!(matches!(err, CascadeError::Inconsistent(_)));
    }

    #[test]
    fn test_backward_child_index_is_rejected() {
        // Node 1 points back at node 1, which would never terminate.
        let stage = "<_><stageThreshold>0</stageThreshold><weakClassifiers><_>\
                     <internalNodes>1 -1 0 0.5 1 -2 0 0.5</internalNodes>\
                     <leafValues>-1 1 0</leafValues></_></weakClassifiers></_>";
        let err = HaarCascade::parse(&cascade_with(stage, ONE_FEATURE)).unwrap_err();
        assert!(matches!(err, CascadeError::Inconsistent(_)));
    }

    #[test]
    fn test_leaf_index_out_of_range_is_rejected() {
        let stage = "<_><stageThreshold>0</stageThreshold><weakClassifiers><_>\
                     <internalNodes>0 -3 0 0.5</internalNodes>\
                     <leafValues>-1 1</leafValues></_></weakClassifiers></_>";
        let err = HaarCascade::parse(&cascade_with(stage, ONE_FEATURE)).unwrap_err();
        assert!(matches!(err, CascadeError::Inconsistent(_)));
    }

    #[test]
    fn test_feature_outside_window_is_rejected() {
        let stage = "<_><stageThreshold>0</stageThreshold><weakClassifiers><_>\
                     <internalNodes>0 -1 0 0.5</internalNodes>\
                     <leafValues>-1 1</leafValues></_></weakClassifiers></_>";
        let feature = "<_><rects><_>4 4 4 4 1.</_></rects></_>";
        let err = HaarCascade::parse(&cascade_with(stage, feature)).unwrap_err();
        assert!(matches!(err, CascadeError::Inconsistent(_)));
    }

    #[test]
    fn test_bad_number_is_invalid_value() {
        let stage = "<_><stageThreshold>zero</stageThreshold><weakClassifiers>\
                     </weakClassifiers></_>";
        let err = HaarCascade::parse(&cascade_with(stage, ONE_FEATURE)).unwrap_err();
        assert!(matches!(
            err,
            CascadeError::InvalidValue {
                element: "stageThreshold",
                ..
            }
        ));
    }

    #[test]
    fn test_two_level_tree_follows_children() {
        // Root splits on the bright-centre feature; its right child is a
        // second node that always takes its right leaf.
        let stage = "<_><stageThreshold>0</stageThreshold><weakClassifiers><_>\
                     <internalNodes>0 1 0 0.5 -1 -2 0 -100.</internalNodes>\
                     <leafValues>-1 -1 1</leafValues></_></weakClassifiers></_>";
        let cascade = HaarCascade::parse(&cascade_with(stage, ONE_FEATURE)).unwrap();
        let ii = IntegralImage::new(&image_with_square(48, 20, 8));
        assert!(!cascade.passes(&ii, 0, 0));
        assert!(cascade.passes(&ii, 18, 20));
    }

    #[test]
    fn test_rejecting_stage_reports_first_failure() {
        let stump = |threshold: &str| {
            format!(
                "<_><stageThreshold>{threshold}</stageThreshold><weakClassifiers><_>\
                 <internalNodes>0 -1 0 0.5</internalNodes>\
                 <leafValues>-1 1</leafValues></_></weakClassifiers></_>"
            )
        };
        // The second stage can never reach its threshold.
        let stages = format!("{}{}", stump("0"), stump("5"));
        let cascade = HaarCascade::parse(&cascade_with(&stages, ONE_FEATURE)).unwrap();
        let ii = IntegralImage::new(&image_with_square(48, 20, 8));

        assert_eq!(cascade.rejecting_stage(&ii, 0, 0), Some(0));
        assert_eq!(cascade.rejecting_stage(&ii, 18, 20), Some(1));
        assert!(!cascade.passes(&ii, 18, 20));
    }

    #[test]
    fn test_accepted_window_has_no_rejecting_stage() {
        let cascade = HaarCascade::parse(BRIGHT_CENTRE_CASCADE).unwrap();
        let ii = IntegralImage::new(&image_with_square(48, 20, 8));
        assert_eq!(cascade.rejecting_stage(&ii, 18, 20), None);
    }
}
