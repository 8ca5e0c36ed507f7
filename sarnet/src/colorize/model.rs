use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig, ConvTranspose2d, ConvTranspose2dConfig},
        BatchNorm, BatchNormConfig, Dropout, DropoutConfig, PaddingConfig2d,
    },
    prelude::*,
    tensor::activation::{leaky_relu, relu, tanh},
};

const LEAKY_SLOPE: f64 = 0.2;
const DROPOUT: f64 = 0.5;

/// Conv k4 s2 p1, optional batch norm, LeakyReLU(0.2). Halves H and W.
#[derive(Module, Debug)]
pub struct DownsamplingBlock<B: Backend> {
    pub conv: Conv2d<B>,
    pub bn: Option<BatchNorm<B, 2>>,
}

impl<B: Backend> DownsamplingBlock<B> {
    pub fn new(c_in: usize, c_out: usize, use_norm: bool, device: &B::Device) -> Self {
        let conv = Conv2dConfig::new([c_in, c_out], [4, 4])
            .with_stride([2, 2])
            .with_padding(PaddingConfig2d::Explicit(1, 1))
            .with_bias(true)
            .init(device);
        let bn = use_norm.then(|| BatchNormConfig::new(c_out).init(device));
        Self { conv, bn }
    }

    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.conv.forward(x);
        let x = match &self.bn {
            Some(bn) => bn.forward(x),
            None => x,
        };
        leaky_relu(x, LEAKY_SLOPE)
    }
}

/// Transposed conv k4 s2 p1, batch norm, optional dropout, ReLU. Doubles H and W.
#[derive(Module, Debug)]
pub struct UpsamplingBlock<B: Backend> {
    pub conv: ConvTranspose2d<B>,
    pub bn: BatchNorm<B, 2>,
    pub dropout: Option<Dropout>,
}

impl<B: Backend> UpsamplingBlock<B> {
    pub fn new(c_in: usize, c_out: usize, use_dropout: bool, device: &B::Device) -> Self {
        let conv = ConvTranspose2dConfig::new([c_in, c_out], [4, 4])
            .with_stride([2, 2])
            .with_padding([1, 1])
            .with_bias(true)
            .init(device);
        let bn = BatchNormConfig::new(c_out).init(device);
        let dropout = use_dropout.then(|| DropoutConfig::new(DROPOUT).init());
        Self { conv, bn, dropout }
    }

    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.bn.forward(self.conv.forward(x));
        // Dropout is the identity on a non-autodiff backend.
        let x = match &self.dropout {
            Some(dropout) => dropout.forward(x),
            None => x,
        };
        relu(x)
    }
}

#[derive(Module, Debug)]
pub struct UnetEncoder<B: Backend> {
    pub enc1: DownsamplingBlock<B>,
    pub enc2: DownsamplingBlock<B>,
    pub enc3: DownsamplingBlock<B>,
    pub enc4: DownsamplingBlock<B>,
    pub enc5: DownsamplingBlock<B>,
    pub enc6: DownsamplingBlock<B>,
    pub enc7: DownsamplingBlock<B>,
    pub enc8: DownsamplingBlock<B>,
}

impl<B: Backend> UnetEncoder<B> {
    /// Activations of every stage, deepest first.
    pub fn forward(&self, x: Tensor<B, 4>) -> [Tensor<B, 4>; 8] {
        let x1 = self.enc1.forward(x);
        let x2 = self.enc2.forward(x1.clone());
        let x3 = self.enc3.forward(x2.clone());
        let x4 = self.enc4.forward(x3.clone());
        let x5 = self.enc5.forward(x4.clone());
        let x6 = self.enc6.forward(x5.clone());
        let x7 = self.enc7.forward(x6.clone());
        let x8 = self.enc8.forward(x7.clone());
        [x8, x7, x6, x5, x4, x3, x2, x1]
    }
}

#[derive(Module, Debug)]
pub struct UnetDecoder<B: Backend> {
    pub dec1: UpsamplingBlock<B>,
    pub dec2: UpsamplingBlock<B>,
    pub dec3: UpsamplingBlock<B>,
    pub dec4: UpsamplingBlock<B>,
    pub dec5: UpsamplingBlock<B>,
    pub dec6: UpsamplingBlock<B>,
    pub dec7: UpsamplingBlock<B>,
    pub dec8: UpsamplingBlock<B>,
}

impl<B: Backend> UnetDecoder<B> {
    /// `skips` is the encoder output, deepest first. Each stage's input is
    /// the matching skip concatenated with the previous stage on channels.
    pub fn forward(&self, skips: [Tensor<B, 4>; 8]) -> Tensor<B, 4> {
        let [x8, x7, x6, x5, x4, x3, x2, x1] = skips;
        let x = Tensor::cat(vec![x7, self.dec1.forward(x8)], 1);
        let x = Tensor::cat(vec![x6, self.dec2.forward(x)], 1);
        let x = Tensor::cat(vec![x5, self.dec3.forward(x)], 1);
        let x = Tensor::cat(vec![x4, self.dec4.forward(x)], 1);
        let x = Tensor::cat(vec![x3, self.dec5.forward(x)], 1);
        let x = Tensor::cat(vec![x2, self.dec6.forward(x)], 1);
        let x = Tensor::cat(vec![x1, self.dec7.forward(x)], 1);
        self.dec8.forward(x)
    }
}

/// Pix2pix-style U-Net mapping a 1-channel SAR image to 3-channel color in [-1, 1].
#[derive(Module, Debug)]
pub struct UnetGenerator<B: Backend> {
    pub encoder: UnetEncoder<B>,
    pub decoder: UnetDecoder<B>,
    pub final_conv: Conv2d<B>,
}

impl<B: Backend> UnetGenerator<B> {
    /// `[N, c_in, H, W]` to `[N, c_out, H, W]`. H and W must be multiples of 256.
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let skips = self.encoder.forward(x);
        let x = self.decoder.forward(skips);
        tanh(self.final_conv.forward(x))
    }
}

#[derive(Config, Debug)]
pub struct UnetGeneratorConfig {
    #[config(default = 1)]
    pub c_in: usize,
    #[config(default = 3)]
    pub c_out: usize,
    /// Width of the first encoder stage; the trained checkpoint uses 64.
    #[config(default = 64)]
    pub base_channels: usize,
}

impl UnetGeneratorConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> UnetGenerator<B> {
        let w = self.base_channels;
        let (w1, w2, w4, w8) = (w, w * 2, w * 4, w * 8);

        let encoder = UnetEncoder {
            enc1: DownsamplingBlock::new(self.c_in, w1, false, device),
            enc2: DownsamplingBlock::new(w1, w2, true, device),
            enc3: DownsamplingBlock::new(w2, w4, true, device),
            enc4: DownsamplingBlock::new(w4, w8, true, device),
            enc5: DownsamplingBlock::new(w8, w8, true, device),
            enc6: DownsamplingBlock::new(w8, w8, true, device),
            enc7: DownsamplingBlock::new(w8, w8, true, device),
            enc8: DownsamplingBlock::new(w8, w8, true, device),
        };

        let decoder = UnetDecoder {
            dec1: UpsamplingBlock::new(w8, w8, true, device),
            dec2: UpsamplingBlock::new(w8 * 2, w8, true, device),
            dec3: UpsamplingBlock::new(w8 * 2, w8, true, device),
            dec4: UpsamplingBlock::new(w8 * 2, w8, false, device),
            dec5: UpsamplingBlock::new(w8 * 2, w4, false, device),
            dec6: UpsamplingBlock::new(w4 * 2, w2, false, device),
            dec7: UpsamplingBlock::new(w2 * 2, w1, false, device),
            dec8: UpsamplingBlock::new(w1 * 2, w1, false, device),
        };

        let final_conv = Conv2dConfig::new([w1, self.c_out], [3, 3])
            .with_stride([1, 1])
            .with_padding(PaddingConfig2d::Explicit(1, 1))
            .with_bias(true)
            .init(device);

        UnetGenerator {
            encoder,
            decoder,
            final_conv,
        }
    }
}
