pub mod labelled_box_annotator;
